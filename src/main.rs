use env_logger::Env;
use noodle_engine::{
    midi::MidiQueue,
    mixer::Mixer,
    note::Note,
    processor::TestTone,
    render::{OfflineRender, ScheduledMidi},
    session::{Session, SessionConfig},
    synth::{OscillatorOpts, VoiceOscillator, Waveform},
    track::Track,
};
use rand::Rng;
use std::{str::FromStr, time::Duration};

/// Semitone offsets of the demo arpeggio, played from middle C.
const ARPEGGIO: [i8; 4] = [0, 4, 7, 4];
const NOTE_LENGTH: Duration = Duration::from_millis(50);
const NOTE_GAP: Duration = Duration::from_millis(450);

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = SessionConfig::default();
    if let Some(port) = env_var("NOODLE_MIDI_PORT") {
        config.midi.port_index = port;
    }
    if let Some(sample_rate) = env_var("NOODLE_SAMPLE_RATE") {
        config.mixer.sample_rate = sample_rate;
    }
    let mut opts = OscillatorOpts::default();
    if let Some(waveform) = env_var::<Waveform>("NOODLE_WAVEFORM") {
        opts.waveform = waveform;
    }
    let test_tone = std::env::var_os("NOODLE_TEST_TONE").is_some();

    let setup = |mixer: &mut Mixer| {
        let osc = mixer.register_processor(VoiceOscillator::new(opts));
        if test_tone {
            let mut tone = TestTone::new(440.0);
            tone.set_gain(0.25);
            mixer.register_processor(tone);
        }
        // Listen on every channel
        vec![Track::new(0xffff).with_processor(osc)]
    };

    let mut args = std::env::args().skip(1);
    if let (Some(flag), Some(path)) = (args.next(), args.next()) {
        if flag == "--render" {
            let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(4.0);
            let (mut session, mut renderer) = Session::offline(&config.mixer, setup);
            let script = demo_script(seconds);
            match OfflineRender::new(&mut session, &mut renderer, 512).to_wav(&path, &script, seconds) {
                Ok(stats) => log::info!("Rendered {} frames to {} (peak {:.3})", stats.frames, path, stats.peak),
                Err(err) => log::error!("Render failed: {}", err),
            }
            return;
        }
        log::warn!("Unknown argument {}", flag);
    }

    let mut session = Session::open(&config, setup);
    if !session.is_midi_connected() {
        log::info!("No MIDI input, playing a demo arpeggio");
        play_demo(session.midi_queue().clone());
    }

    // Control loop
    loop {
        session.process();
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Feeds the demo arpeggio into `queue` from a background thread, as a MIDI driver would.
fn play_demo(queue: MidiQueue) {
    std::thread::spawn(move || {
        let mut rng = rand::thread_rng();
        std::thread::sleep(Duration::from_millis(500));
        loop {
            for offset in ARPEGGIO {
                let note = Note::middle_c().transpose(offset);
                queue.push_raw(&[0x90, note.0, rng.gen_range(80..=127)]);
                std::thread::sleep(NOTE_LENGTH);
                queue.push_raw(&[0x80, note.0, 0]);
                std::thread::sleep(NOTE_GAP);
            }
        }
    });
}

/// The demo arpeggio as a timed script, for offline rendering.
fn demo_script(seconds: f64) -> Vec<ScheduledMidi> {
    let mut rng = rand::thread_rng();
    let step = (NOTE_LENGTH + NOTE_GAP).as_secs_f64();
    let notes = ARPEGGIO.iter().cycle().map(|&offset| Note::middle_c().transpose(offset));

    let mut script = vec![];
    for (i, note) in notes.enumerate() {
        let time = i as f64 * step;
        if time >= seconds {
            break;
        }
        script.push(ScheduledMidi::new(time, &[0x90, note.0, rng.gen_range(80..=127)]));
        script.push(ScheduledMidi::new(time + NOTE_LENGTH.as_secs_f64(), &[0x80, note.0, 0]));
    }
    script
}

fn env_var<T: FromStr>(name: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    let value = std::env::var(name).ok()?;
    match value.parse() {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("Ignoring {}={}: {}", name, value, err);
            None
        }
    }
}
