use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;
const FREQUENCY_HZ: f32 = 440.0;
const ATTACK_SECS: f32 = 0.1;
const TOTAL_SECS: f32 = 0.3;
const PEAK_AMPLITUDE: f32 = 0.2;

/// Posture warning chime
/// A short 440 Hz sine with a linear attack and release envelope, matching
/// the tone the original app synthesized through WebAudio.
pub struct WarningTone {
    sample_rate: u32,
    num_sample: usize,
    total_samples: usize,
}

impl WarningTone {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            num_sample: 0,
            total_samples: (TOTAL_SECS * SAMPLE_RATE as f32) as usize,
        }
    }
}

impl Default for WarningTone {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for WarningTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }

        let t = self.num_sample as f32 / self.sample_rate as f32;
        self.num_sample += 1;

        // Ramp up for the attack, then ramp down over the remainder.
        let envelope = if t < ATTACK_SECS {
            PEAK_AMPLITUDE * (t / ATTACK_SECS)
        } else {
            PEAK_AMPLITUDE * (1.0 - (t - ATTACK_SECS) / (TOTAL_SECS - ATTACK_SECS))
        };

        Some((2.0 * PI * FREQUENCY_HZ * t).sin() * envelope.max(0.0))
    }
}

impl Source for WarningTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.num_sample))
    }

    fn channels(&self) -> u16 {
        1 // Mono
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(TOTAL_SECS))
    }
}
