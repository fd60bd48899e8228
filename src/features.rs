//! Feature bitfield carried by the `5` tag.
//!
//! The payload is a big-endian bit string of length `5 * word_count`:
//! bit 0 is the least-significant bit of the *last* word. Even indices
//! mean the feature is required, odd indices mean it is supported.

/// Named feature pairs. Each occupies bit `pair_index()` (required) and
/// `pair_index() + 1` (supported).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    OptionDataLossProtect,
    InitialRoutingSync,
    OptionUpfrontShutdownScript,
    GossipQueries,
    VarOnionOptin,
    GossipQueriesEx,
    OptionStaticRemotekey,
    PaymentSecret,
    BasicMpp,
    OptionSupportLargeChannel,
}

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::OptionDataLossProtect,
        Feature::InitialRoutingSync,
        Feature::OptionUpfrontShutdownScript,
        Feature::GossipQueries,
        Feature::VarOnionOptin,
        Feature::GossipQueriesEx,
        Feature::OptionStaticRemotekey,
        Feature::PaymentSecret,
        Feature::BasicMpp,
        Feature::OptionSupportLargeChannel,
    ];

    /// Even bit index of the pair.
    pub fn pair_index(self) -> usize {
        match self {
            Feature::OptionDataLossProtect => 0,
            Feature::InitialRoutingSync => 2,
            Feature::OptionUpfrontShutdownScript => 4,
            Feature::GossipQueries => 6,
            Feature::VarOnionOptin => 8,
            Feature::GossipQueriesEx => 10,
            Feature::OptionStaticRemotekey => 12,
            Feature::PaymentSecret => 14,
            Feature::BasicMpp => 16,
            Feature::OptionSupportLargeChannel => 18,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::OptionDataLossProtect => "option_data_loss_protect",
            Feature::InitialRoutingSync => "initial_routing_sync",
            Feature::OptionUpfrontShutdownScript => "option_upfront_shutdown_script",
            Feature::GossipQueries => "gossip_queries",
            Feature::VarOnionOptin => "var_onion_optin",
            Feature::GossipQueriesEx => "gossip_queries_ex",
            Feature::OptionStaticRemotekey => "option_static_remotekey",
            Feature::PaymentSecret => "payment_secret",
            Feature::BasicMpp => "basic_mpp",
            Feature::OptionSupportLargeChannel => "option_support_large_channel",
        }
    }
}

/// First bit index that has no assigned name.
const NAMED_BIT_CEILING: usize = 20;

/// The decoded feature words, kept verbatim so a re-encode reproduces the
/// original word length byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureBits {
    words: Vec<u8>,
}

impl FeatureBits {
    /// Wrap the raw 5-bit words of a feature tag payload.
    pub fn from_words(words: Vec<u8>) -> Self {
        FeatureBits { words }
    }

    /// Build the minimal bitfield with the given absolute bit indices set.
    pub fn from_bit_indices(bits: &[usize]) -> Self {
        let word_length = match bits.iter().max() {
            Some(max) => max / 5 + 1,
            None => 0,
        };
        let mut words = vec![0u8; word_length];
        for &i in bits {
            words[word_length - 1 - i / 5] |= 1 << (i % 5);
        }
        FeatureBits { words }
    }

    pub fn words(&self) -> &[u8] {
        &self.words
    }

    pub fn word_length(&self) -> usize {
        self.words.len()
    }

    pub fn bit_count(&self) -> usize {
        self.words.len() * 5
    }

    /// Bit `i` of the field; indices past the end read as unset.
    pub fn bit(&self, i: usize) -> bool {
        let len = self.words.len();
        if i >= len * 5 {
            return false;
        }
        (self.words[len - 1 - i / 5] >> (i % 5)) & 1 == 1
    }

    pub fn is_required(&self, feature: Feature) -> bool {
        self.bit(feature.pair_index())
    }

    pub fn is_supported(&self, feature: Feature) -> bool {
        self.bit(feature.pair_index() + 1)
    }

    /// Set bit positions outside the named range, lowest first.
    pub fn extra_bits(&self) -> Vec<usize> {
        (NAMED_BIT_CEILING..self.bit_count())
            .filter(|&i| self.bit(i))
            .collect()
    }

    /// Whether any unnamed set bit sits at an even (required) index.
    pub fn has_extra_required(&self) -> bool {
        self.extra_bits().iter().any(|i| i % 2 == 0)
    }
}
