//! Plays ringing alarms until they are stopped.
//!
//! Built with the `playback` feature the worker plays through the default
//! audio device; without it, it only logs what it would play.

use std::thread;

use crossbeam_channel::Receiver;
use log::{error, info};

use crate::communication::{Message, MessageType};

/// runs the player until every sender of `messages` is gone
pub fn spawn(messages: Receiver<Message>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = run(&messages) {
            error!("sound playback stopped: {e}");
        }
    })
}

#[cfg(feature = "playback")]
fn run(messages: &Receiver<Message>) -> Result<(), Box<dyn std::error::Error>> {
    use std::{collections::HashMap, fs::File, io::BufReader};

    use rodio::{Decoder, Sink, Source};

    let stream_handle = rodio::OutputStreamBuilder::open_default_stream()?;
    let mut ringing: HashMap<crate::alarm::AlarmId, Sink> = HashMap::new();
    for Message { kind, alarm_id } in messages {
        match kind {
            MessageType::AlarmTriggered { sound_path } => {
                let file = match File::open(&sound_path) {
                    Ok(file) => file,
                    Err(e) => {
                        error!("couldn't open sound file {}: {e}", sound_path.display());
                        continue;
                    }
                };
                let input = match Decoder::new(BufReader::new(file)) {
                    Ok(decoder) => decoder.repeat_infinite(),
                    Err(e) => {
                        error!("couldn't decode {}: {e}", sound_path.display());
                        continue;
                    }
                };
                info!("alarm {alarm_id} ringing with {}", sound_path.display());
                let sink = Sink::connect_new(stream_handle.mixer());
                sink.append(input);
                sink.play();
                // replacing an old sink drops it, which stops it
                ringing.insert(alarm_id, sink);
            }
            MessageType::AlarmStopped => {
                if let Some(sink) = ringing.remove(&alarm_id) {
                    info!("alarm {alarm_id} silenced");
                    sink.stop();
                }
            }
        }
    }
    Ok(())
}

#[cfg(not(feature = "playback"))]
#[allow(clippy::unnecessary_wraps)]
fn run(messages: &Receiver<Message>) -> Result<(), Box<dyn std::error::Error>> {
    for Message { kind, alarm_id } in messages {
        match kind {
            MessageType::AlarmTriggered { sound_path } => {
                info!("alarm {alarm_id} would ring with {}", sound_path.display());
            }
            MessageType::AlarmStopped => info!("alarm {alarm_id} silenced"),
        }
    }
    Ok(())
}
