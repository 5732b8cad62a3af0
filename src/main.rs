use std::{error::Error, io::BufRead, path::Path, thread};

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use crossbeam_channel::{select, Receiver, Sender};
use log::{debug, error, info};
use reveille::{
    backend::TimerBackend,
    communication::{Message, SoundCue},
    playback, Alarm, AlarmClock, AlarmId, AlarmStore, Config, FireOutcome, FiredTrigger, Sound,
    UserAction,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// write the default config
    Init {
        #[clap(long, short)]
        force: bool,
    },
    /// add an alarm that rings every day at TIME (HH:MM)
    Add {
        time: String,
        #[clap(long, short, default_value = "")]
        label: String,
        #[clap(long, short, default_value_t = Sound::Piano)]
        sound: Sound,
        /// use the variant of the sound that gets louder
        #[clap(long)]
        increasing: bool,
        /// snooze length in minutes (1-30)
        #[clap(long, default_value_t = 5)]
        snooze: u32,
        #[clap(long, conflicts_with = "snooze")]
        no_snooze: bool,
        #[clap(long)]
        disabled: bool,
    },
    List,
    Remove {
        id: String,
    },
    Enable {
        id: String,
    },
    Disable {
        id: String,
    },
    /// ring alarms until stdin says `quit`
    Run,
}

/// what can be typed while the scheduler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Snooze,
    Stop,
    Reload,
    List,
    Quit,
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "snooze" | "s" => Some(Self::Snooze),
            "stop" | "x" => Some(Self::Stop),
            "reload" | "r" => Some(Self::Reload),
            "list" | "l" => Some(Self::List),
            "quit" | "q" => Some(Self::Quit),
            _ => None,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    // initilize the logger
    simple_file_logger::init_logger!("reveille").expect("couldn't initialize logger");

    let args = Args::parse();
    let config_path = Config::config_path()?;
    match args.command.unwrap_or(Command::Run) {
        Command::Init { force } => {
            if force || !config_path.exists() {
                Config::new().save(&config_path)?;
                println!("wrote {}", config_path.display());
            } else {
                println!("{} already exists, use --force to overwrite", config_path.display());
            }
        }
        Command::Add {
            time,
            label,
            sound,
            increasing,
            snooze,
            no_snooze,
            disabled,
        } => {
            let config = Config::load(&config_path)?;
            let mut store = AlarmStore::open(config.alarms_path()?)?;
            let time = NaiveTime::parse_from_str(&time, "%H:%M")?;
            let alarm = Alarm::new(time)
                .with_label(label)
                .with_sound(sound, increasing)
                .with_snooze(if no_snooze { None } else { Some(snooze) })
                .with_enabled(!disabled);
            let id = alarm.id.clone();
            store.create(alarm)?;
            store.persist()?;
            println!("added alarm {id}, `reload` a running scheduler to pick it up");
        }
        Command::List => {
            let config = Config::load(&config_path)?;
            let store = AlarmStore::open(config.alarms_path()?)?;
            print_alarms(&store);
        }
        Command::Remove { id } => {
            let config = Config::load(&config_path)?;
            let mut store = AlarmStore::open(config.alarms_path()?)?;
            store.delete(&AlarmId::new(id))?;
            store.persist()?;
        }
        Command::Enable { id } => toggle(&config_path, id, true)?,
        Command::Disable { id } => toggle(&config_path, id, false)?,
        Command::Run => run(&Config::load(&config_path)?)?,
    }
    Ok(())
}

fn toggle(config_path: &Path, id: String, enabled: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load(config_path)?;
    let mut store = AlarmStore::open(config.alarms_path()?)?;
    store.set_enabled(&AlarmId::new(id), enabled)?;
    store.persist()?;
    Ok(())
}

fn print_alarms(store: &AlarmStore) {
    if store.is_empty() {
        println!("no alarms");
    }
    for alarm in store.alarms() {
        println!("{}  {alarm}", alarm.id);
    }
}

/// forwards stdin lines, the channel closes at end of input
fn read_input() -> Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

struct Ringing {
    trigger: FiredTrigger,
    cue: SoundCue,
}

fn run(config: &Config) -> Result<(), Box<dyn Error>> {
    let alarms_path = config.alarms_path()?;
    let sounds_dir = config.sounds_path()?;
    let (backend, fired) = TimerBackend::spawn();
    let mut clock = AlarmClock::new(
        AlarmStore::open(alarms_path.clone())?,
        backend,
        config.snooze.clone(),
    );
    if let Err(e) = clock.reconcile() {
        error!("initial reconciliation failed: {e}");
        eprintln!("couldn't schedule every alarm: {e}");
    }

    let (sounds, sound_rx) = crossbeam_channel::unbounded();
    let player = playback::spawn(sound_rx);
    let input = read_input();
    let closed = crossbeam_channel::never();
    let mut stdin_open = true;
    let mut ringing: Option<Ringing> = None;
    println!("scheduler running, commands: snooze, stop, reload, list, quit");

    loop {
        select! {
            recv(fired) -> trigger => {
                let Ok(trigger) = trigger else { break };
                match clock.on_trigger_fired(&trigger.id, &trigger.payload, UserAction::None) {
                    Ok(FireOutcome::Ringing(cue)) => {
                        if let Some(previous) = ringing.take() {
                            silence(&sounds, previous.cue.alarm_id);
                        }
                        println!(
                            "{}: {} ({})",
                            cue.title,
                            cue.body,
                            if cue.snoozable { "snooze or stop" } else { "stop" }
                        );
                        send(&sounds, Message::triggered(&cue, &sounds_dir));
                        ringing = Some(Ringing { trigger, cue });
                    }
                    Ok(outcome) => debug!("{}: {outcome:?}", trigger.id),
                    Err(e) => error!("handling {}: {e}", trigger.id),
                }
            }
            recv(if stdin_open { &input } else { &closed }) -> line => {
                let Ok(line) = line else {
                    info!("stdin closed, running without input");
                    stdin_open = false;
                    continue;
                };
                match Input::parse(&line) {
                    Some(Input::Snooze) => respond(&mut clock, &mut ringing, &sounds, UserAction::Postpone),
                    Some(Input::Stop) => respond(&mut clock, &mut ringing, &sounds, UserAction::Stop),
                    Some(Input::Reload) => match AlarmStore::open(alarms_path.clone()) {
                        Ok(store) => match clock.reload(store) {
                            Ok(count) => println!("scheduled {count} alarms"),
                            Err(e) => eprintln!("couldn't schedule every alarm: {e}"),
                        },
                        Err(e) => eprintln!("couldn't reload alarms: {e}"),
                    },
                    Some(Input::List) => print_alarms(clock.store()),
                    Some(Input::Quit) => break,
                    None => eprintln!("unknown command {:?}", line.trim()),
                }
            }
        }
    }

    clock.into_backend().shutdown();
    drop(sounds);
    if player.join().is_err() {
        error!("sound player panicked");
    }
    Ok(())
}

fn respond(
    clock: &mut AlarmClock<TimerBackend>,
    ringing: &mut Option<Ringing>,
    sounds: &Sender<Message>,
    action: UserAction,
) {
    let Some(current) = ringing.take() else {
        println!("nothing is ringing");
        return;
    };
    if action == UserAction::Postpone && !current.cue.snoozable {
        println!("this alarm can't be snoozed");
        *ringing = Some(current);
        return;
    }
    silence(sounds, current.cue.alarm_id.clone());
    match clock.on_trigger_fired(&current.trigger.id, &current.trigger.payload, action) {
        Ok(FireOutcome::Snoozed { transition, .. }) => println!("{transition:?}"),
        Ok(FireOutcome::Stopped { .. }) => println!("stopped"),
        Ok(outcome) => debug!("{outcome:?}"),
        Err(e) => {
            error!("{action:?} for {}: {e}", current.trigger.id);
            eprintln!("couldn't {action:?} the alarm: {e}");
        }
    }
}

fn silence(sounds: &Sender<Message>, alarm_id: AlarmId) {
    send(sounds, Message::stopped(alarm_id));
}

fn send(sounds: &Sender<Message>, message: Message) {
    if sounds.send(message).is_err() {
        error!("sound player is gone");
    }
}
