use super::{Mixer, MixerControl, MixerRenderer};
use crate::error::AudioError;
use basedrop::Handle;
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, SampleRate, Stream, StreamConfig,
};

impl Mixer {
    /// Opens the default output device and starts rendering into it.
    ///
    /// If the device cannot be opened the error is logged and the returned mixer is inert:
    /// no processor is ever invoked and the application carries on without sound.
    pub fn start(self, handle: &Handle) -> MixerControl {
        let (control, renderer) = self.split(handle);
        match open_output_stream(renderer) {
            Ok(stream) => MixerControl {
                stream: Some(stream),
                ..control
            },
            Err(err) => {
                log::error!("Audio output unavailable, continuing without sound: {}", err);
                control.inert()
            }
        }
    }
}

fn open_output_stream(mut renderer: MixerRenderer) -> Result<Stream, AudioError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
    match device.name() {
        Ok(name) => log::info!("Audio output device: \"{}\"", name),
        Err(err) => log::debug!("Could not read audio output device name: {}", err),
    }

    let sample_rate = renderer.state().sample_rate();
    let config = StreamConfig {
        channels: 2,
        sample_rate: SampleRate(sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            renderer.render(data);
        },
        move |err| {
            log::error!("an error occurred on the output stream: {}", err);
        },
        None,
    )?;
    stream.play()?;

    log::info!("Audio output started at {} Hz", sample_rate);
    Ok(stream)
}
