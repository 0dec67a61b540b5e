// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Simulated audio mixer reporting channel completions into the main loop.
//!
//! Usage: `sandbox [config.json]`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use beacon_core::event::{CompletionEvent, FrameEvent};
use beacon_core::Handle;
use beacon_runtime::{logging, Runtime, RuntimeConfig};
use beacon_script::{ChannelCallbacks, ListenerMode, Notifier, ScriptValue};

const FRAMES: u64 = 30;
const FRAME_TIME: Duration = Duration::from_millis(16);
const MIXER_THREADS: u32 = 4;

/// State the mixer threads must not touch once the main loop is gone.
struct Mixer {
    channels: u32,
}

fn spawn_mixer(
    worker: u32,
    mixer: Handle<Mixer>,
    notifier: Arc<Notifier>,
    callbacks: Arc<ChannelCallbacks>,
) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut reported = 0;
        let mut channel = worker;
        loop {
            let Some(state) = mixer.get() else {
                log::debug!("Mixer {worker}: mixer is gone, stopping.");
                break;
            };
            if channel >= state.channels {
                break;
            }
            thread::sleep(FRAME_TIME * (worker + 1));

            let listener = callbacks.take(channel as usize);
            let event = CompletionEvent::new(channel, 100 + channel, true);
            if notifier
                .schedule_dispatch_with(Box::new(event), listener)
                .is_some()
            {
                reported += 1;
            }
            channel += MIXER_THREADS;
        }
        reported
    })
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => RuntimeConfig::from_file(&path)?,
        None => RuntimeConfig::default(),
    };
    logging::init(&config.log_filter);

    let mut runtime = Runtime::new(config).context("starting the runtime")?;
    let state = runtime.state_handle();
    let script = state.get().context("script state is gone")?;

    let frames = Arc::new(AtomicUsize::new(0));
    let f = frames.clone();
    script.add_event_listener(
        FrameEvent::NAME,
        ScriptValue::function(move |_| {
            f.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }),
    );

    let completions = Arc::new(AtomicUsize::new(0));
    let notifier = runtime.create_notifier(ListenerMode::Subscription);
    let channel_count = runtime.channels().len() as u32;

    // Every channel starts playing with its own completion callback.
    for channel in 0..channel_count {
        let c = completions.clone();
        let listener = script.register(ScriptValue::function(move |event| {
            c.fetch_add(1, Ordering::Relaxed);
            log::info!(
                "Channel {channel} finished (source {}).",
                event.get("source").cloned().unwrap_or_default()
            );
            Ok(())
        }));
        script.release(runtime.channels().swap(channel as usize, listener));
    }

    let mixer = runtime.allocator().create_owned(Mixer {
        channels: channel_count,
    })?;
    let workers: Vec<_> = (0..MIXER_THREADS)
        .map(|worker| {
            spawn_mixer(
                worker,
                mixer.observe(),
                notifier.clone(),
                runtime.channels().clone(),
            )
        })
        .collect();

    for _ in 0..FRAMES {
        runtime.tick();
        thread::sleep(FRAME_TIME);
    }

    // Shut down while the slower mixers still have channels in flight.
    drop(mixer);
    runtime.shutdown();

    let mut reported = 0;
    for worker in workers {
        reported += worker
            .join()
            .map_err(|_| anyhow::anyhow!("mixer thread panicked"))?;
    }

    log::info!(
        "{} frame(s), {} of {} completion(s) delivered, {} reported by mixers.",
        frames.load(Ordering::Relaxed),
        completions.load(Ordering::Relaxed),
        channel_count,
        reported
    );
    log::info!("Handle stats: {:?}", runtime.handle_stats());
    Ok(())
}
