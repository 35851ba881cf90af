//! Port model: channel layouts and their flat, addressable port lists.
//!
//! A node describes its channel layout with a [`PortCount`]: an input and an
//! output count for every [`PortType`]. [`PortCount::to_ports`] expands that
//! layout into the ordered list of [`Port`]s that connections address by
//! index.
//!
//! # Port Ordering
//!
//! Port types are visited in their canonical order (`Audio`, `Control`, `Cv`,
//! `Atom`, `Event`, `Midi`). Within each type all inputs come first, then all
//! outputs. Every port receives the next global index, so a stereo effect with
//! one MIDI input expands to:
//!
//! | index | type  | dir | channel | symbol       |
//! |-------|-------|-----|---------|--------------|
//! | 0     | Audio | in  | 0       | `audio_in_1` |
//! | 1     | Audio | in  | 1       | `audio_in_2` |
//! | 2     | Audio | out | 0       | `audio_out_1`|
//! | 3     | Audio | out | 1       | `audio_out_2`|
//! | 4     | MIDI  | in  | 0       | `midi_in_1`  |

use core::fmt;

/// Kind of channel a port carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PortType {
    /// Audio sample stream.
    Audio,
    /// Control-rate scalar.
    Control,
    /// Audio-rate control voltage.
    Cv,
    /// Structured atom messages.
    Atom,
    /// Timestamped events.
    Event,
    /// MIDI messages.
    Midi,
}

impl PortType {
    /// Number of port types (terminal sentinel for indexing).
    pub const COUNT: usize = 6;

    /// All port types in canonical order.
    pub const ALL: [PortType; Self::COUNT] = [
        PortType::Audio,
        PortType::Control,
        PortType::Cv,
        PortType::Atom,
        PortType::Event,
        PortType::Midi,
    ];

    /// Returns the position of this type in the canonical order.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the type for a canonical index, or `None` if out of range.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Lowercase identifier used in port symbols (e.g. `"audio"`).
    pub const fn slug(self) -> &'static str {
        match self {
            PortType::Audio => "audio",
            PortType::Control => "control",
            PortType::Cv => "cv",
            PortType::Atom => "atom",
            PortType::Event => "event",
            PortType::Midi => "midi",
        }
    }

    /// Human-readable name used in port display names (e.g. `"MIDI"`).
    pub const fn name(self) -> &'static str {
        match self {
            PortType::Audio => "Audio",
            PortType::Control => "Control",
            PortType::Cv => "CV",
            PortType::Atom => "Atom",
            PortType::Event => "Event",
            PortType::Midi => "MIDI",
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Input and output channel counts for every [`PortType`].
///
/// Counts are unsigned, so a layout can never describe a negative number of
/// channels. Use [`with()`](Self::with) / [`with_both()`](Self::with_both) to
/// derive a modified copy without touching the original.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PortCount {
    inputs: [u32; PortType::COUNT],
    outputs: [u32; PortType::COUNT],
}

impl PortCount {
    /// Creates a layout with zero ports of every type.
    pub const fn new() -> Self {
        Self {
            inputs: [0; PortType::COUNT],
            outputs: [0; PortType::COUNT],
        }
    }

    /// Shorthand for an audio-only layout.
    pub fn audio(inputs: u32, outputs: u32) -> Self {
        Self::new().with_both(PortType::Audio, inputs, outputs)
    }

    /// Returns the input or output count for `port_type`.
    #[inline]
    pub fn get(&self, port_type: PortType, is_input: bool) -> u32 {
        if is_input {
            self.inputs[port_type.index()]
        } else {
            self.outputs[port_type.index()]
        }
    }

    /// Sets the input or output count for `port_type`.
    pub fn set(&mut self, port_type: PortType, count: u32, is_input: bool) {
        let counts = if is_input {
            &mut self.inputs
        } else {
            &mut self.outputs
        };
        counts[port_type.index()] = count;
    }

    /// Sets both input and output counts for `port_type`.
    pub fn set_both(&mut self, port_type: PortType, inputs: u32, outputs: u32) {
        self.set(port_type, inputs, true);
        self.set(port_type, outputs, false);
    }

    /// Returns a copy with one count replaced.
    pub fn with(&self, port_type: PortType, count: u32, is_input: bool) -> Self {
        let mut ret = *self;
        ret.set(port_type, count, is_input);
        ret
    }

    /// Returns a copy with both counts of `port_type` replaced.
    pub fn with_both(&self, port_type: PortType, inputs: u32, outputs: u32) -> Self {
        let mut ret = *self;
        ret.set_both(port_type, inputs, outputs);
        ret
    }

    /// Resets every count to zero.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Total number of input ports across all types.
    pub fn total_inputs(&self) -> u32 {
        self.inputs.iter().sum()
    }

    /// Total number of output ports across all types.
    pub fn total_outputs(&self) -> u32 {
        self.outputs.iter().sum()
    }

    /// Total number of ports (inputs and outputs) across all types.
    pub fn total(&self) -> u32 {
        self.total_inputs() + self.total_outputs()
    }

    /// Expands the layout into its ordered port list.
    ///
    /// Pure: each call builds a fresh list.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports = Vec::with_capacity(self.total() as usize);
        let mut index = 0u32;

        for port_type in PortType::ALL {
            let slug = port_type.slug();
            let name = port_type.name();

            for channel in 0..self.get(port_type, true) {
                ports.push(Port {
                    port_type,
                    index,
                    channel,
                    is_input: true,
                    symbol: format!("{slug}_in_{}", channel + 1),
                    name: format!("{name} In {}", channel + 1),
                });
                index += 1;
            }

            for channel in 0..self.get(port_type, false) {
                ports.push(Port {
                    port_type,
                    index,
                    channel,
                    is_input: false,
                    symbol: format!("{slug}_out_{}", channel + 1),
                    name: format!("{name} Out {}", channel + 1),
                });
                index += 1;
            }
        }

        ports
    }
}

/// One addressable channel of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Port {
    /// Channel kind.
    pub port_type: PortType,
    /// Global index within the node, unique across all types and directions.
    pub index: u32,
    /// Zero-based index within this type and direction.
    pub channel: u32,
    /// `true` for inputs, `false` for outputs.
    pub is_input: bool,
    /// Symbolic name, e.g. `audio_in_1`.
    pub symbol: String,
    /// Display name, e.g. `Audio In 1`.
    pub name: String,
}

impl Port {
    /// Returns `true` if this is an output port.
    #[inline]
    pub fn is_output(&self) -> bool {
        !self.is_input
    }
}
