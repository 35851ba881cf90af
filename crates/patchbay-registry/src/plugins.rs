//! Built-in plugin implementations.

use std::f32::consts::TAU;

use patchbay_core::{Plugin, PortCount, PortType};

/// Reads `N` little-endian `f32` values from a state blob.
fn read_f32s<const N: usize>(data: &[u8]) -> Result<[f32; N], String> {
    if data.len() != N * 4 {
        return Err(format!("expected {} bytes, got {}", N * 4, data.len()));
    }
    let mut values = [0.0; N];
    for (value, chunk) in values.iter_mut().zip(data.chunks_exact(4)) {
        *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if !value.is_finite() {
            return Err("non-finite value".to_string());
        }
    }
    Ok(values)
}

/// Stereo gain stage.
///
/// State: the linear gain as one little-endian `f32`.
#[derive(Debug, Clone)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Creates a unity-gain stage.
    pub fn new() -> Self {
        Self { gain: 1.0 }
    }

    /// Returns the linear gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Sets the linear gain.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Gain {
    fn name(&self) -> &str {
        "Gain"
    }

    fn port_count(&self) -> PortCount {
        PortCount::audio(2, 2)
    }

    fn process(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
        for (input, output) in inputs.iter().zip(outputs.iter_mut()) {
            for (o, i) in output[..frames].iter_mut().zip(&input[..frames]) {
                *o = *i * self.gain;
            }
        }
    }

    fn state(&self) -> Vec<u8> {
        if self.gain == 1.0 {
            return Vec::new();
        }
        self.gain.to_le_bytes().to_vec()
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), String> {
        let [gain] = read_f32s::<1>(data)?;
        self.gain = gain;
        Ok(())
    }
}

/// Stereo sine generator.
///
/// State: frequency in Hz and linear level, two little-endian `f32`s.
#[derive(Debug, Clone)]
pub struct Tone {
    frequency: f32,
    level: f32,
    phase: f32,
    sample_rate: f32,
}

impl Tone {
    /// Creates a 440 Hz tone at -12 dBFS.
    pub fn new() -> Self {
        Self {
            frequency: 440.0,
            level: 0.25,
            phase: 0.0,
            sample_rate: 48000.0,
        }
    }

    /// Sets the frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Sets the linear output level.
    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for Tone {
    fn name(&self) -> &str {
        "Tone"
    }

    fn port_count(&self) -> PortCount {
        PortCount::audio(0, 2)
    }

    fn prepare(&mut self, sample_rate: f32, _block_size: usize) {
        self.sample_rate = sample_rate;
        self.phase = 0.0;
    }

    fn process(&mut self, _inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
        let increment = self.frequency / self.sample_rate;
        let start = self.phase;
        for output in outputs.iter_mut() {
            let mut phase = start;
            for sample in &mut output[..frames] {
                *sample = (phase * TAU).sin() * self.level;
                phase = (phase + increment).fract();
            }
            self.phase = phase;
        }
    }

    fn state(&self) -> Vec<u8> {
        let mut data = self.frequency.to_le_bytes().to_vec();
        data.extend_from_slice(&self.level.to_le_bytes());
        data
    }

    fn set_state(&mut self, data: &[u8]) -> Result<(), String> {
        let [frequency, level] = read_f32s::<2>(data)?;
        if frequency <= 0.0 {
            return Err(format!("frequency must be positive, got {frequency}"));
        }
        self.frequency = frequency;
        self.level = level;
        Ok(())
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

/// Sums two stereo pairs into one.
///
/// Inputs 0/1 are the first pair, 2/3 the second.
#[derive(Debug, Clone, Default)]
pub struct Mixer;

impl Plugin for Mixer {
    fn name(&self) -> &str {
        "Mixer"
    }

    fn port_count(&self) -> PortCount {
        PortCount::audio(4, 2)
    }

    fn process(&mut self, inputs: &[Vec<f32>], outputs: &mut [Vec<f32>], frames: usize) {
        for (ch, output) in outputs.iter_mut().enumerate() {
            let out = &mut output[..frames];
            out.fill(0.0);
            for input in inputs.iter().skip(ch).step_by(2) {
                for (o, i) in out.iter_mut().zip(&input[..frames]) {
                    *o += *i;
                }
            }
        }
    }
}

/// MIDI pass-through with no audio ports.
///
/// The renderer carries audio only, so this node exists for routing.
#[derive(Debug, Clone, Default)]
pub struct MidiThru;

impl Plugin for MidiThru {
    fn name(&self) -> &str {
        "MIDI Thru"
    }

    fn port_count(&self) -> PortCount {
        PortCount::new().with_both(PortType::Midi, 1, 1)
    }

    fn process(&mut self, _: &[Vec<f32>], _: &mut [Vec<f32>], _: usize) {}
}
