//! Tokio task that owns a [`PlaybackEngine`] and serialises control
//! commands with its tick timer and pending teardowns.

use std::future;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::plan::AudioPlan;

use super::clock::Clock;
use super::config::{LayerOverrides, RenderMode};
use super::engine::{PlaybackEngine, Teardown};
use super::graph::{AudioBackend, LiveGraph};
use super::host::{PlaybackHost, PlaybackObserver};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackCommand {
    Start,
    Pause,
    Resume,
    Stop,
    BeginScrub,
    EndScrub,
    Seek(usize),
    SetPlaybackIndex(usize),
    SetRenderMode(RenderMode),
    SetAiPlan(Option<AudioPlan>),
    SetEnabledLayers(LayerOverrides),
    /// Stop, release every graph and return the engine.
    Shutdown,
}

/// Run until `Shutdown` arrives or every sender is dropped, then hand the
/// engine back.
pub async fn run<H, O, B, C>(
    mut engine: PlaybackEngine<H, O, B, C>,
    mut commands: UnboundedReceiver<PlaybackCommand>,
) -> PlaybackEngine<H, O, B, C>
where
    H: PlaybackHost,
    O: PlaybackObserver,
    B: AudioBackend,
    C: Clock,
{
    let mut teardowns: Vec<Teardown<B::Graph>> = Vec::new();

    loop {
        let now = engine.clock().now_ms();
        let next_due = engine
            .timer_deadline_ms()
            .into_iter()
            .chain(teardowns.iter().map(|t| t.due_at_ms))
            .min();
        let wait = next_due.map(|due| Duration::from_millis(due.saturating_sub(now)));

        tokio::select! {
            command = commands.recv() => match command {
                None | Some(PlaybackCommand::Shutdown) => break,
                Some(command) => {
                    if let Some(teardown) = apply(&mut engine, command) {
                        teardowns.push(teardown);
                    }
                }
            },
            _ = sleep_or_pending(wait) => {
                engine.poll_timer();
                finish_due(&mut teardowns, engine.clock().now_ms());
            }
        }
    }

    if let Some(teardown) = engine.stop() {
        teardowns.push(teardown);
    }
    debug!(pending = teardowns.len(), "driver shutting down");
    teardowns.into_iter().for_each(Teardown::finish);
    engine
}

fn apply<H, O, B, C>(
    engine: &mut PlaybackEngine<H, O, B, C>,
    command: PlaybackCommand,
) -> Option<Teardown<B::Graph>>
where
    H: PlaybackHost,
    O: PlaybackObserver,
    B: AudioBackend,
    C: Clock,
{
    match command {
        PlaybackCommand::Start => engine.start(),
        PlaybackCommand::Pause => engine.pause(),
        PlaybackCommand::Resume => engine.resume(),
        PlaybackCommand::Stop => return engine.stop(),
        PlaybackCommand::BeginScrub => engine.begin_scrub(),
        PlaybackCommand::EndScrub => engine.end_scrub(),
        PlaybackCommand::Seek(index) => engine.seek(index),
        PlaybackCommand::SetPlaybackIndex(index) => engine.set_playback_index(index),
        PlaybackCommand::SetRenderMode(mode) => engine.set_render_mode(mode),
        PlaybackCommand::SetAiPlan(plan) => engine.set_ai_plan(plan),
        PlaybackCommand::SetEnabledLayers(layers) => engine.set_enabled_layers(layers),
        PlaybackCommand::Shutdown => {}
    }
    None
}

async fn sleep_or_pending(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => future::pending().await,
    }
}

fn finish_due<G: LiveGraph>(teardowns: &mut Vec<Teardown<G>>, now_ms: u64) {
    let (due, pending): (Vec<_>, Vec<_>) = teardowns.drain(..).partition(|t| t.due_at_ms <= now_ms);
    *teardowns = pending;
    due.into_iter().for_each(Teardown::finish);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::clock::SystemClock;
    use crate::realtime::config::EngineConfig;
    use crate::realtime::engine::PlaybackState;
    use crate::realtime::graph::VirtualBackend;
    use crate::realtime::host::{AnalyticsHost, PlaybackEvent, Selection};
    use tokio::sync::mpsc::unbounded_channel;
    use tokio::time::sleep;

    type TestEngine =
        PlaybackEngine<AnalyticsHost, Vec<PlaybackEvent>, VirtualBackend<SystemClock>, SystemClock>;

    fn engine(points: usize, ms_per_step: u64) -> TestEngine {
        let clock = SystemClock::new();
        let host = AnalyticsHost {
            selection: Selection::new(0, points - 1),
            rho_e: vec![Some(0.0); points],
            ms_per_step,
            ..AnalyticsHost::default()
        };
        PlaybackEngine::new(
            EngineConfig::default(),
            host,
            Vec::new(),
            VirtualBackend::new(clock),
            clock,
        )
    }

    #[tokio::test]
    async fn plays_through_and_shuts_down() {
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(run(engine(4, 5), rx));
        tx.send(PlaybackCommand::Start).unwrap();
        sleep(Duration::from_millis(150)).await;
        tx.send(PlaybackCommand::Shutdown).unwrap();
        let engine = task.await.unwrap();

        let steps: Vec<usize> = engine
            .observer()
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Step(i) => Some(*i),
                _ => None,
            })
            .collect();
        assert_eq!(steps, vec![0, 0, 1, 2, 3, 3]);
        assert!(!engine.is_active());
        assert_eq!(engine.observer().last(), Some(&PlaybackEvent::Active(false)));
    }

    #[tokio::test]
    async fn stop_releases_graph_after_delay() {
        let engine = engine(100, 20);
        let stats = engine.backend().state();
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(run(engine, rx));
        tx.send(PlaybackCommand::Start).unwrap();
        sleep(Duration::from_millis(30)).await;
        tx.send(PlaybackCommand::Stop).unwrap();
        sleep(Duration::from_millis(20)).await;
        assert_eq!(stats.lock().unwrap().graphs_closed, 0);
        sleep(Duration::from_millis(300)).await;
        assert_eq!(stats.lock().unwrap().graphs_closed, 1);

        drop(tx);
        let engine = task.await.unwrap();
        assert!(!engine.is_active());
    }

    #[tokio::test]
    async fn shutdown_finishes_pending_teardowns() {
        let engine = engine(100, 20);
        let stats = engine.backend().state();
        let (tx, rx) = unbounded_channel();
        let task = tokio::spawn(run(engine, rx));
        tx.send(PlaybackCommand::Start).unwrap();
        tx.send(PlaybackCommand::Stop).unwrap();
        tx.send(PlaybackCommand::Shutdown).unwrap();
        let engine = task.await.unwrap();
        assert_eq!(engine.state(), PlaybackState::Stopped);
        let s = stats.lock().unwrap();
        assert_eq!(s.graphs_created, 1);
        assert_eq!(s.graphs_closed, 1);
    }
}
