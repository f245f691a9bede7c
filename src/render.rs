use crate::{error::RenderError, mixer::MixerRenderer, session::Session};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::Path;

/// A raw MIDI frame scheduled at a time in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledMidi {
    pub time: f64,
    pub bytes: Vec<u8>,
}

impl ScheduledMidi {
    pub fn new(time: f64, bytes: &[u8]) -> Self {
        Self {
            time,
            bytes: bytes.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderStats {
    pub frames: usize,
    /// Largest absolute sample value.
    pub peak: f32,
}

/// Drives a session and its renderer block by block, without an audio device.
///
/// MIDI from `script` is delivered at block granularity, through the same queue and
/// routing as live input.
pub struct OfflineRender<'a> {
    session: &'a mut Session,
    renderer: &'a mut MixerRenderer,
    block_frames: usize,
}

impl<'a> OfflineRender<'a> {
    pub fn new(session: &'a mut Session, renderer: &'a mut MixerRenderer, block_frames: usize) -> Self {
        Self {
            session,
            renderer,
            block_frames: block_frames.max(1),
        }
    }

    /// Renders `duration` seconds, passing every block to `sink` as interleaved stereo.
    pub fn run(
        &mut self,
        script: &[ScheduledMidi],
        duration: f64,
        mut sink: impl FnMut(&[f32]) -> Result<(), RenderError>,
    ) -> Result<RenderStats, RenderError> {
        let sample_rate = self.renderer.state().sample_rate() as f64;
        let total_frames = (duration.max(0.0) * sample_rate).round() as usize;

        let mut script: Vec<&ScheduledMidi> = script.iter().collect();
        script.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut script = script.into_iter().peekable();

        let mut buffer = vec![0.0; 2 * self.block_frames];
        let mut stats = RenderStats::default();

        while stats.frames < total_frames {
            let frames = self.block_frames.min(total_frames - stats.frames);
            let block_end = (stats.frames + frames) as f64 / sample_rate;
            while let Some(event) = script.next_if(|e| e.time < block_end) {
                self.session.midi_queue().push_raw(&event.bytes);
            }
            self.session.process();

            let block = &mut buffer[..2 * frames];
            self.renderer.render(block);
            stats.peak = block.iter().fold(stats.peak, |peak, s| peak.max(s.abs()));
            sink(block)?;
            stats.frames += frames;
        }

        Ok(stats)
    }

    /// Renders `duration` seconds into a 32-bit float stereo WAV file.
    pub fn to_wav(
        &mut self,
        path: impl AsRef<Path>,
        script: &[ScheduledMidi],
        duration: f64,
    ) -> Result<RenderStats, RenderError> {
        let spec = WavSpec {
            channels: 2,
            sample_rate: self.renderer.state().sample_rate(),
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(path, spec)?;
        let stats = self.run(script, duration, |block| {
            for &sample in block {
                writer.write_sample(sample)?;
            }
            Ok(())
        })?;
        writer.finalize()?;
        Ok(stats)
    }
}
