use clap::Parser;
use click_metronome::audio::AudioDeviceManager;
use click_metronome::messaging::channels::{
    ControlProducer, DisplayConsumer, NotificationConsumer, NotificationProducer,
};
use click_metronome::messaging::notification::{Notification, NotificationCategory};
use click_metronome::{
    AudioEngine, ClickSink, ConfigError, ControlCommand, DisplayEvent, Metronome,
    MetronomeConfig, MonotonicClock, NullSink, create_control_channel, create_display_channel,
    create_notification_channel,
};
use ringbuf::traits::{Consumer, Producer};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

// Ringbuffer capacity constants
// Typed commands arrive a few per second at most; display events come one per
// beat (≤ 3.3/s at 200 BPM) plus state changes.
const CONTROL_RINGBUFFER_CAPACITY: usize = 64;
const DISPLAY_RINGBUFFER_CAPACITY: usize = 256;
const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 64;

/// Longest sleep between two passes of the control loop
const MAX_IDLE: Duration = Duration::from_millis(20);

#[derive(Parser)]
#[command(name = "click-metronome")]
#[command(author, version, about = "Terminal metronome with synthesized clicks", long_about = None)]
struct Cli {
    /// Config file path (default: <config dir>/click-metronome/config.ron)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial tempo (40-200)
    #[arg(short, long)]
    bpm: Option<u16>,

    /// Beats per bar (2-6)
    #[arg(long)]
    beats: Option<u8>,

    /// Master volume (0.0-1.0)
    #[arg(long)]
    volume: Option<f32>,

    /// Do not accent the first beat of the bar
    #[arg(long)]
    no_accent: bool,

    /// Output device name
    #[arg(short, long)]
    device: Option<String>,

    /// Run without opening an audio device
    #[arg(long)]
    silent: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

impl Cli {
    fn apply(&self, config: &mut MetronomeConfig) {
        if let Some(bpm) = self.bpm {
            config.bpm = bpm;
        }
        if let Some(beats) = self.beats {
            config.time_signature = beats;
        }
        if let Some(volume) = self.volume {
            config.volume = volume;
        }
        if self.no_accent {
            config.accent_first = false;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Could not start input thread: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    if cli.list_devices {
        for device in AudioDeviceManager::new().list_output_devices() {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return Ok(());
    }

    let mut config = MetronomeConfig::load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    let tempo = config.tempo_state()?;

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notification_tx = Arc::new(Mutex::new(notification_tx));
    let (display_tx, mut display_rx) = create_display_channel(DISPLAY_RINGBUFFER_CAPACITY);
    let (control_tx, mut control_rx) = create_control_channel(CONTROL_RINGBUFFER_CAPACITY);

    let sink: Box<dyn ClickSink> = if cli.silent {
        log::info!("Running silent");
        Box::new(NullSink::new())
    } else {
        match AudioEngine::new(&config.audio, config.volume, notification_tx.clone()) {
            Ok(engine) => Box::new(engine),
            Err(e) => {
                log::warn!("Audio output unavailable, running silent: {}", e);
                Box::new(NullSink::new())
            }
        }
    };

    let mut metronome =
        Metronome::new(tempo, config.volume, MonotonicClock::new(), sink).with_events(display_tx);

    spawn_input_thread(control_tx, notification_tx)?;

    print_help();
    print_status(&metronome);

    'control: loop {
        while let Some(command) = control_rx.try_pop() {
            if !handle_command(&mut metronome, command) {
                break 'control;
            }
        }

        metronome.poll();
        drain_display(&mut display_rx);
        drain_notifications(&mut notification_rx);

        let idle = metronome
            .time_until_next()
            .map_or(MAX_IDLE, |wait| wait.min(MAX_IDLE));
        thread::sleep(idle);
    }

    metronome.stop();
    drain_display(&mut display_rx);
    log::info!("Bye");
    Ok(())
}

/// Returns false when the loop should exit
fn handle_command<S: ClickSink>(metronome: &mut Metronome<S>, command: ControlCommand) -> bool {
    match command {
        ControlCommand::Toggle => {
            metronome.toggle();
        }
        ControlCommand::Start => metronome.start(),
        ControlCommand::Stop => metronome.stop(),
        ControlCommand::NudgeTempo(delta) => {
            let target = i32::from(metronome.bpm().get()) + delta;
            metronome.set_tempo_clamped(target);
        }
        ControlCommand::SlideTempo(bpm) => {
            metronome.set_tempo_clamped(bpm);
        }
        ControlCommand::EnterTempo(text) => {
            if let Err(e) = metronome.set_tempo_from_entry(&text) {
                log::warn!("{}", e);
                println!("Tempo stays at {}", metronome.bpm());
            }
        }
        ControlCommand::SetBeats(beats) => {
            if let Err(e) = metronome.set_time_signature(beats) {
                log::warn!("{}", e);
            }
        }
        ControlCommand::SetAccent(accent) => {
            metronome.set_accent_first(accent);
            print_status(metronome);
        }
        ControlCommand::SetVolume(volume) => {
            metronome.set_volume(volume);
            print_status(metronome);
        }
        ControlCommand::Tap => match metronome.register_tap() {
            Some(bpm) => println!("Tap: {}", bpm),
            None => println!("Tap ({} in history)", metronome.tap_count()),
        },
        ControlCommand::Status => print_status(metronome),
        ControlCommand::Quit => return false,
    }
    true
}

fn spawn_input_thread(
    mut control_tx: ControlProducer,
    notification_tx: Arc<Mutex<NotificationProducer>>,
) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin".into())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else {
                    break;
                };

                match ControlCommand::parse(&line) {
                    Some(command) => {
                        let quit = command == ControlCommand::Quit;
                        if control_tx.try_push(command).is_err() {
                            log::warn!("Control queue full, command dropped");
                        }
                        if quit {
                            return;
                        }
                    }
                    None => {
                        if let Ok(mut tx) = notification_tx.lock() {
                            let notif = Notification::warning(
                                NotificationCategory::Input,
                                format!("Unknown command: {:?} (type ? for status)", line.trim()),
                            );
                            let _ = tx.try_push(notif);
                        }
                    }
                }
            }

            // stdin closed
            let _ = control_tx.try_push(ControlCommand::Quit);
        })?;
    Ok(())
}

fn drain_display(display_rx: &mut DisplayConsumer) {
    while let Some(event) = display_rx.try_pop() {
        match event {
            DisplayEvent::Beat(beat) => {
                let bar: String = (0..beat.beats_per_bar)
                    .map(|index| match (index == beat.beat_index, beat.is_accent) {
                        (true, true) => '●',
                        (true, false) => '◉',
                        (false, _) => '·',
                    })
                    .collect();
                println!("{}  {} BPM", bar, beat.bpm);
            }
            DisplayEvent::Started => println!("▶ playing"),
            DisplayEvent::Stopped => println!("■ stopped"),
            DisplayEvent::TempoChanged(bpm) => println!("tempo {} BPM", bpm),
            DisplayEvent::TimeSignatureChanged(beats) => println!("time signature {}/4", beats),
        }
    }
}

fn drain_notifications(notification_rx: &mut NotificationConsumer) {
    while let Some(notification) = notification_rx.try_pop() {
        notification.log();
    }
}

fn print_status<S: ClickSink>(metronome: &Metronome<S>) {
    let snapshot = metronome.snapshot();
    println!(
        "{} BPM | {}/4 | accent {} | volume {:.0}% | {}",
        snapshot.bpm,
        snapshot.beats_per_bar,
        if snapshot.accent_first { "on" } else { "off" },
        snapshot.volume * 100.0,
        if snapshot.is_playing { "playing" } else { "stopped" },
    );
}

fn print_help() {
    println!("=== Click Metronome ===");
    println!("  <enter> | t      start/stop");
    println!("  + | -            tempo ±1 BPM");
    println!("  bpm <40-200>     set tempo");
    println!("  slide <n>        set tempo, clamped");
    println!("  beats <2-6>      beats per bar");
    println!("  accent on|off    accent first beat");
    println!("  vol <0.0-1.0>    volume");
    println!("  tap | .          tap tempo");
    println!("  ? | status       show settings");
    println!("  q                quit\n");
}
