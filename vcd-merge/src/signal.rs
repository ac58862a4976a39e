//! Signal value changes
//!
//! A [`Signal`] is one timestamped value of a named, sized signal. Its
//! identity (name path, type, size, source) is fixed when the owning source
//! creates it; only the timestamp is adjusted later, when the merge moves a
//! source onto the common time axis.

use crate::registry::SourceHandle;
use std::fmt;

/// Delimiter between the hierarchy levels of a signal name
pub const SIGNAL_NAME_DELIM: char = '.';

/// Size reported for real signals
pub const REAL_SIGNAL_SIZE: usize = 64;

/// Kind of a signal, used as the VCD variable type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    /// Bit vector
    Wire,
    /// 64-bit floating point
    Real,
}

impl SignalType {
    /// The VCD `$var` type keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::Wire => "wire",
            SignalType::Real => "real",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a signal value change
#[derive(Debug, Clone, PartialEq)]
pub enum SignalValue {
    /// Bits, most significant first; each one of `0`, `1`, `x` or `z`
    Wire(String),
    /// Real number
    Real(f64),
}

impl SignalValue {
    /// Binary representation of `value`, zero-padded to `size` bits
    pub fn from_integer(value: u64, size: usize) -> Self {
        SignalValue::Wire(format!("{:0width$b}", value, width = size.max(1)))
    }

    /// The signal type carrying this payload
    pub fn signal_type(&self) -> SignalType {
        match self {
            SignalValue::Wire(_) => SignalType::Wire,
            SignalValue::Real(_) => SignalType::Real,
        }
    }
}

impl fmt::Display for SignalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalValue::Wire(bits) => write!(f, "b{}", bits),
            SignalValue::Real(v) => write!(f, "r{}", v),
        }
    }
}

/// One value change of a signal.
///
/// `Clone` is a deep copy. Equality compares only the value payload: two
/// changes of the same signal are equal when dumping the second one would
/// not change the waveform.
#[derive(Debug, Clone)]
pub struct Signal {
    name: String,
    size: usize,
    timestamp: u64,
    source: SourceHandle,
    value: SignalValue,
}

impl Signal {
    /// Create a bit-vector signal from an integer value
    pub fn wire(
        name: impl Into<String>,
        size: usize,
        timestamp: u64,
        value: u64,
        source: SourceHandle,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            timestamp,
            source,
            value: SignalValue::from_integer(value, size),
        }
    }

    /// Create a bit-vector signal from its textual bits
    pub fn wire_bits(
        name: impl Into<String>,
        size: usize,
        timestamp: u64,
        bits: impl Into<String>,
        source: SourceHandle,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            timestamp,
            source,
            value: SignalValue::Wire(bits.into()),
        }
    }

    /// Create a real signal
    pub fn real(name: impl Into<String>, timestamp: u64, value: f64, source: SourceHandle) -> Self {
        Self {
            name: name.into(),
            size: REAL_SIGNAL_SIZE,
            timestamp,
            source,
            value: SignalValue::Real(value),
        }
    }

    /// Full hierarchical name, e.g. `Top.Cpu.Pc`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the signal. Used by sources applying a prefix.
    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Split the name into its hierarchy levels.
    ///
    /// Empty levels are kept as they are: `A..B` yields `["A", "", "B"]`.
    pub fn name_fields(&self) -> Vec<&str> {
        self.name.split(SIGNAL_NAME_DELIM).collect()
    }

    /// Size in bits (0 if unspecified)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Timestamp in the time unit of the owning source
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub(crate) fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    /// The VCD variable type of this signal
    pub fn signal_type(&self) -> SignalType {
        self.value.signal_type()
    }

    /// Handle of the source this signal was read from
    pub fn source(&self) -> SourceHandle {
        self.source
    }

    /// The value payload
    pub fn value(&self) -> &SignalValue {
        &self.value
    }

    /// Value change line for the VCD body, e.g. `b0101 !`
    pub fn print(&self, id_code: &str) -> String {
        format!("{} {}", self.value, id_code)
    }

    /// Declaration line for the VCD header, e.g. `$var wire 4 ! Pc $end`.
    ///
    /// The reference is the last name field, or the whole name when that
    /// field is empty; the enclosing fields become scopes.
    pub fn footprint(&self, id_code: &str) -> String {
        let leaf = self
            .name
            .rsplit(SIGNAL_NAME_DELIM)
            .next()
            .filter(|leaf| !leaf.is_empty())
            .unwrap_or(self.name.as_str());
        format!(
            "$var {} {} {} {} $end",
            self.signal_type(),
            self.size,
            id_code,
            leaf
        )
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
