//! Named playback queues.
//!
//! Queued voices carry an index; only index 0 plays. When the head finishes
//! (or is skipped) every remaining index drops, after the queue's delay when
//! one is set. Delays and file decoding run on short-lived `cantor-queue`
//! worker threads, so the voice lock is never held across a decode. A delay
//! worker gives up as soon as the mixer is dropped.

use crate::mixer::{Mixer, MixerState, Shared};
use crate::voice::{decode_file, PlayOptions, QueueSlot, Voice, VoiceHandle, VoiceId, VoiceSource};
use cantor_core::{Error, Result};
use crossbeam_channel::RecvTimeoutError;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A head promoted while its file is still undecoded.
type PendingHead = (VoiceId, PathBuf);

impl Mixer {
    /// Append `items` to queue `name`, `delay` apart. The head of an empty
    /// queue is decoded before this returns; later file items are decoded
    /// when they reach the head. Items that fail to load are reported and
    /// left out.
    pub fn queue(
        &self,
        name: &str,
        delay: Duration,
        items: Vec<VoiceSource>,
    ) -> Result<Vec<VoiceHandle>> {
        if name.is_empty() {
            return self.fail(Error::InvalidArgument("queue name must not be empty".into()));
        }

        let mut voices: Vec<Voice> = items
            .into_iter()
            .map(|source| Voice::new(source, PlayOptions::default()))
            .collect();
        if self.queue_len(name) == 0 {
            // decode the likely head outside the lock
            while let Some(voice) = voices.first_mut() {
                match voice.source.load() {
                    Ok(()) => break,
                    Err(error) => {
                        tracing::warn!("Queue '{}': dropping item: {}", name, error);
                        self.shared.report(&error);
                        voices.remove(0);
                    }
                }
            }
        }

        let mut state = self.shared.state.lock();
        let mut next_index = queue_ids(&state, name).len();
        let mut pending = None;
        let mut handles = Vec::with_capacity(voices.len());
        for mut voice in voices {
            if next_index == 0 {
                // the queue drained after the head was picked
                pending = voice.source.pending_path().map(|path| (voice.id, path.to_path_buf()));
            }
            voice.queue = Some(QueueSlot {
                name: name.to_string(),
                index: next_index,
                delay,
            });
            next_index += 1;
            handles.push(voice.handle());
            state.voices.push(voice);
        }
        drop(state);

        if let Some(head) = pending {
            let name = name.to_string();
            self.spawn_queue_worker(move |shared| load_head(shared, &name, head));
        }
        Ok(handles)
    }

    /// Voices of queue `name`, head first.
    pub fn queued(&self, name: &str) -> Vec<VoiceId> {
        queue_ids(&self.shared.state.lock(), name)
    }

    pub fn queue_len(&self, name: &str) -> usize {
        let state = self.shared.state.lock();
        state
            .voices
            .iter()
            .filter(|v| v.queue_name() == Some(name))
            .count()
    }

    /// Remove the first `count` voices of queue `name`. With `apply_delay`
    /// the new head waits for the removed head's delay first.
    pub fn skip(&self, count: usize, name: &str, apply_delay: bool) {
        if count == 0 {
            return;
        }
        let mut state = self.shared.state.lock();
        let queue = queue_ids(&state, name);
        if queue.len() <= count {
            state.voices.retain(|v| v.queue_name() != Some(name));
            return;
        }

        let mut delay = Duration::ZERO;
        for id in &queue[..count] {
            if let Some(pos) = state.voices.iter().position(|v| v.id == *id) {
                let voice = state.voices.remove(pos);
                if let Some(slot) = voice.queue.filter(|s| s.index == 0) {
                    delay = slot.delay;
                }
            }
        }
        let delay = if apply_delay { delay } else { Duration::ZERO };
        self.schedule_advance(&mut state, name.to_string(), delay, count);
    }

    /// Advance queue `name` by `count` now, or after `delay` on a worker.
    /// A promoted file head is decoded on a worker either way.
    pub(crate) fn schedule_advance(
        &self,
        state: &mut MixerState,
        name: String,
        delay: Duration,
        count: usize,
    ) {
        if delay.is_zero() {
            if let Some(head) = advance_queue(state, &name, count) {
                self.spawn_queue_worker(move |shared| load_head(shared, &name, head));
            }
            return;
        }

        self.spawn_queue_worker(move |shared| match shared.shutdown_rx.recv_timeout(delay) {
            Err(RecvTimeoutError::Timeout) => {
                let promoted = advance_queue(&mut shared.state.lock(), &name, count);
                if let Some(head) = promoted {
                    load_head(shared, &name, head);
                }
            }
            // mixer dropped
            _ => {}
        });
    }

    fn spawn_queue_worker(&self, work: impl FnOnce(&Shared) + Send + 'static) {
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("cantor-queue".into())
            .spawn(move || work(&shared));

        match spawned {
            Ok(handle) => {
                let mut workers = self.shared.workers.lock();
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
            }
            Err(error) => {
                let error = Error::Io(error);
                tracing::error!("Cannot start queue worker: {}", error);
                self.shared.report(&error);
            }
        }
    }

    /// Block until every pending queue advance has run.
    pub fn join_queue_workers(&self) {
        loop {
            let workers = std::mem::take(&mut *self.shared.workers.lock());
            if workers.is_empty() {
                return;
            }
            for worker in workers {
                let _ = worker.join();
            }
        }
    }
}

fn queue_ids(state: &MixerState, name: &str) -> Vec<VoiceId> {
    let mut entries: Vec<(usize, VoiceId)> = state
        .voices
        .iter()
        .filter_map(|v| match &v.queue {
            Some(slot) if slot.name == name => Some((slot.index, v.id)),
            _ => None,
        })
        .collect();
    entries.sort_by_key(|&(index, _)| index);
    entries.into_iter().map(|(_, id)| id).collect()
}

/// Drop every index of queue `name` by `count`, never past a voice already at
/// the head. Returns the new head when its file still needs decoding.
fn advance_queue(state: &mut MixerState, name: &str, count: usize) -> Option<PendingHead> {
    let lowest = state
        .voices
        .iter()
        .filter_map(|v| v.queue.as_ref().filter(|slot| slot.name == name))
        .map(|slot| slot.index)
        .min()?;
    let shift = count.min(lowest);

    let mut pending = None;
    for voice in state.voices.iter_mut() {
        let Some(slot) = voice.queue.as_mut().filter(|slot| slot.name == name) else {
            continue;
        };
        slot.index -= shift;
        if slot.index == 0 {
            if let Some(path) = voice.source.pending_path() {
                pending = Some((voice.id, path.to_path_buf()));
            }
        }
    }
    pending
}

/// Decode a promoted head without the voice lock. A head that fails to load
/// is reported and removed, and the queue moves on.
fn load_head(shared: &Shared, name: &str, head: PendingHead) {
    let mut next = Some(head);
    while let Some((id, path)) = next.take() {
        let decoded = decode_file(&path);
        let mut state = shared.state.lock();
        let Some(voice) = state.voice_mut(id) else {
            // skipped while decoding
            return;
        };
        match decoded {
            Ok(buffer) => voice.source = VoiceSource::Buffer(buffer),
            Err(error) => {
                tracing::warn!("Queue '{}': cannot load {}: {}", name, id, error);
                shared.report(&error);
                state.voices.retain(|v| v.id != id);
                next = advance_queue(&mut state, name, 1);
            }
        }
    }
}
