//! Showreel Daemon
//!
//! Headless host process for the showreel widgets.
//!
//! Responsibilities:
//! - Mount the arc carousel and the media marquee from configuration
//! - Run the frame and pagination drivers
//! - Launch playback starts as cancellable tasks and feed their results back
//! - Handle IPC commands from the CLI

mod config;

use anyhow::{Context, Result};
use config::Config;
use showreel_core_layout::{
    ArcCarousel, CardTransform, ItemId, Marquee, MediaElement, MediaError, MediaSurface,
    PlayTicket, PlaybackState, Rect, TrackSurface,
};
use showreel_ipc::{
    decode_line, encode_line, IpcCardTransform, IpcCommand, IpcResponse, IPC_ADDR,
    MAX_IPC_MESSAGE_SIZE,
};
use showreel_surface::{simulate_play, VirtualTrack};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Events that the daemon event loop processes.
enum DaemonEvent {
    /// An IPC command from a CLI client.
    IpcCommand {
        cmd: IpcCommand,
        responder: oneshot::Sender<IpcResponse>,
    },
    /// Frame driver tick.
    FrameTick,
    /// Pagination driver tick.
    PaginationTick,
    /// A playback start finished.
    PlaybackSettled {
        epoch: u64,
        ticket: PlayTicket,
        result: Result<(), MediaError>,
    },
    /// Shutdown signal.
    Shutdown,
}

/// IPC read timeout - clients must send within this period.
const IPC_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Simulated time a media element needs to start playing.
const PLAYBACK_START_LATENCY: Duration = Duration::from_millis(40);

/// Errors a widget command can fail with.
#[derive(Debug, Error, PartialEq)]
enum CommandError {
    #[error("Arc carousel is not mounted")]
    ArcNotMounted,

    #[error("Marquee is not mounted")]
    MarqueeNotMounted,

    #[error("No card at index {0}")]
    NoSuchCard(usize),

    #[error("No track item {0}")]
    NoSuchItem(usize),

    #[error("Invalid viewport size {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

/// A playback start the event loop still has to launch.
#[derive(Debug, Clone, PartialEq)]
struct PlaybackRequest {
    epoch: u64,
    ticket: PlayTicket,
    source: Option<String>,
}

/// Widget state, owned by the event loop.
struct AppState {
    /// User configuration.
    config: Config,
    viewport_width: f64,
    viewport_height: f64,
    arc: Option<ArcCarousel>,
    marquee: Option<Marquee<VirtualTrack>>,
    /// Card transforms applied by the last frame.
    frame: Vec<CardTransform>,
    /// Bumped whenever the widgets are rebuilt; results from older mounts are dropped.
    epoch: u64,
    pending_playback: Vec<PlaybackRequest>,
    stopped_items: Vec<ItemId>,
    last_frame_at: Option<Instant>,
    /// Daemon start time for uptime reporting.
    start_time: Instant,
}

fn mount_arc(config: &Config, viewport_width: f64) -> Option<ArcCarousel> {
    let stage = Rect::new(0.0, 0.0, viewport_width, config.arc.stage_height);
    match ArcCarousel::new(
        Some(stage),
        config.cards(),
        viewport_width,
        config.arc_settings(),
    ) {
        Ok(arc) => {
            info!("Arc carousel mounted with {} cards", arc.len());
            Some(arc)
        }
        Err(e) => {
            warn!("Arc carousel not mounted: {}", e);
            None
        }
    }
}

fn mount_marquee(
    config: &Config,
    viewport_width: f64,
    now: Instant,
) -> Option<Marquee<VirtualTrack>> {
    let widths: Vec<f64> = config.marquee.items.iter().map(|i| i.width).collect();
    let has_media: Vec<bool> = config
        .marquee
        .items
        .iter()
        .map(|i| i.video.is_some())
        .collect();

    let track = match VirtualTrack::new(&widths, &has_media, config.marquee.gap_px, viewport_width)
    {
        Ok(track) => track,
        Err(e) => {
            warn!("Marquee track rejected: {}", e);
            return None;
        }
    };

    match Marquee::new(
        Some(track),
        config.marquee_items(),
        config.marquee_settings(),
        now,
    ) {
        Ok(marquee) => Some(marquee),
        Err(e) => {
            warn!("Marquee not mounted: {}", e);
            None
        }
    }
}

fn to_ipc_transform(t: &CardTransform) -> IpcCardTransform {
    IpcCardTransform {
        index: t.index,
        x: t.x,
        y: t.y,
        rotation_deg: t.rotation_deg,
        scale: t.scale,
        z_index: t.z_index,
        brightness: t.brightness,
        depth: t.depth,
    }
}

impl AppState {
    /// Create state and mount both widgets.
    fn new_with_config(config: Config, now: Instant) -> Self {
        let mut state = Self {
            viewport_width: config.viewport.width,
            viewport_height: config.viewport.height,
            config,
            arc: None,
            marquee: None,
            frame: Vec::new(),
            epoch: 0,
            pending_playback: Vec::new(),
            stopped_items: Vec::new(),
            last_frame_at: None,
            start_time: now,
        };
        state.mount(now);
        state
    }

    /// Build both widgets from the current config, replacing any existing ones.
    fn mount(&mut self, now: Instant) {
        self.epoch += 1;
        self.pending_playback.clear();
        self.stopped_items.clear();
        self.last_frame_at = None;

        self.arc = mount_arc(&self.config, self.viewport_width);
        self.marquee = mount_marquee(&self.config, self.viewport_width, now);
        self.frame = self
            .arc
            .as_ref()
            .map(ArcCarousel::layout)
            .unwrap_or_default();
    }

    /// Swap in a freshly loaded config and rebuild the widgets.
    fn apply_config(&mut self, mut config: Config, now: Instant) {
        for w in config.validate() {
            warn!("Config: {} - {}", w.field, w.message);
        }
        self.config = config;
        self.mount(now);
        info!("Configuration applied, widgets rebuilt (epoch {})", self.epoch);
    }

    fn frame_period(&self) -> Duration {
        Duration::from_millis(self.config.motion.frame_interval_ms)
    }

    fn pagination_period(&self) -> Duration {
        Duration::from_millis(self.config.marquee.pagination_interval_ms)
    }

    /// Handle an IPC command and return the response.
    fn handle_command(&mut self, cmd: IpcCommand, now: Instant) -> IpcResponse {
        match cmd {
            IpcCommand::Reload => match Config::load() {
                Ok(new_config) => {
                    self.apply_config(new_config, now);
                    IpcResponse::Ok
                }
                Err(e) => IpcResponse::error(format!("Failed to reload config: {}", e)),
            },
            // Shutdown is sent by the client handler once the response is out.
            IpcCommand::Stop => IpcResponse::Ok,
            cmd => match self.dispatch(cmd) {
                Ok(response) => response,
                Err(e) => {
                    debug!("Command failed: {}", e);
                    IpcResponse::error(e.to_string())
                }
            },
        }
    }

    fn dispatch(&mut self, cmd: IpcCommand) -> Result<IpcResponse, CommandError> {
        match cmd {
            IpcCommand::Wheel {
                delta_y,
                section_top,
                section_height,
            } => {
                let viewport_height = self.viewport_height;
                let arc = self.arc.as_mut().ok_or(CommandError::ArcNotMounted)?;
                let section = Rect::new(0.0, section_top, arc.viewport_width(), section_height);
                let accepted = arc.wheel(delta_y, section, viewport_height);
                debug!(
                    "Wheel {} at top {}: {}",
                    delta_y,
                    section_top,
                    if accepted.is_some() { "accepted" } else { "ignored" }
                );
                Ok(IpcResponse::Wheel {
                    accepted: accepted.is_some(),
                    target_offset: arc.smoother().target(),
                })
            }
            IpcCommand::PointerEnter { item } => {
                let ticket = self.marquee_item(item)?.pointer_enter(item);
                self.queue_playback(ticket);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerDown { item } => {
                let ticket = self.marquee_item(item)?.pointer_down(item);
                self.queue_playback(ticket);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerLeave { item } => {
                let stopped = self.marquee_item(item)?.pointer_leave(item);
                self.record_stop(item, stopped);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::PointerCancel { item } => {
                let stopped = self.marquee_item(item)?.pointer_cancel(item);
                self.record_stop(item, stopped);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::Blur { item } => {
                let stopped = self.marquee_item(item)?.blur(item);
                self.record_stop(item, stopped);
                Ok(IpcResponse::Ok)
            }
            IpcCommand::Resize { width, height } => {
                self.resize(width, height)?;
                Ok(IpcResponse::Ok)
            }
            IpcCommand::Activate { index } => {
                let arc = self.arc.as_ref().ok_or(CommandError::ArcNotMounted)?;
                let overlay = arc.activate(index).ok_or(CommandError::NoSuchCard(index))?;
                info!("Card {} activated: {}", index, overlay.title);
                Ok(IpcResponse::Overlay {
                    title: overlay.title,
                    text: overlay.text,
                    image: overlay.image,
                })
            }
            IpcCommand::QueryArc => {
                let arc = self.arc.as_ref().ok_or(CommandError::ArcNotMounted)?;
                let layout = arc.layout_config();
                Ok(IpcResponse::ArcState {
                    offset: arc.smoother().current(),
                    target_offset: arc.smoother().target(),
                    wide: self.config.arc_geometry().is_wide(arc.viewport_width()),
                    step: layout.step,
                    cards: self.frame.iter().map(to_ipc_transform).collect(),
                })
            }
            IpcCommand::QueryMarquee => {
                let marquee = self.marquee.as_ref().ok_or(CommandError::MarqueeNotMounted)?;
                Ok(IpcResponse::MarqueeState {
                    position: marquee.position(),
                    base_width: marquee.base_width(),
                    track_items: marquee.surface().len(),
                    paused: marquee.is_paused(),
                    active_index: marquee.active_index(),
                    dots: marquee.dots(),
                    playing: marquee.media().playing_items(),
                    hovered: marquee.hovered_items(),
                })
            }
            IpcCommand::QueryStatus => Ok(IpcResponse::Status {
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: self.start_time.elapsed().as_secs(),
                viewport_width: self.viewport_width,
                viewport_height: self.viewport_height,
                reduced_motion: self.config.motion.prefers_reduced_motion,
                arc_cards: self.arc.as_ref().map_or(0, ArcCarousel::len),
                marquee_items: self.marquee.as_ref().map_or(0, |m| m.item_count()),
            }),
            IpcCommand::Reload | IpcCommand::Stop => Ok(IpcResponse::Ok),
        }
    }

    /// Marquee, if mounted and `item` is on its track.
    fn marquee_item(
        &mut self,
        item: ItemId,
    ) -> Result<&mut Marquee<VirtualTrack>, CommandError> {
        let marquee = self.marquee.as_mut().ok_or(CommandError::MarqueeNotMounted)?;
        if item >= marquee.surface().len() {
            return Err(CommandError::NoSuchItem(item));
        }
        Ok(marquee)
    }

    fn queue_playback(&mut self, ticket: Option<PlayTicket>) {
        let Some(ticket) = ticket else {
            return;
        };
        let source = self
            .marquee
            .as_ref()
            .and_then(|m| m.surface().media(ticket.item))
            .and_then(|media| media.source())
            .map(str::to_string);
        debug!("Queued playback start for item {}", ticket.item);
        self.pending_playback.push(PlaybackRequest {
            epoch: self.epoch,
            ticket,
            source,
        });
    }

    fn record_stop(&mut self, item: ItemId, stopped: bool) {
        if stopped {
            debug!("Item {} stopped", item);
            self.stopped_items.push(item);
        }
    }

    fn resize(&mut self, width: f64, height: f64) -> Result<(), CommandError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(CommandError::InvalidViewport { width, height });
        }
        self.viewport_width = width;
        self.viewport_height = height;

        if let Some(arc) = self.arc.as_mut() {
            arc.resize(width, self.config.arc.stage_height);
            self.frame = arc.layout();
        }
        if let Some(marquee) = self.marquee.as_mut() {
            marquee.surface_mut().set_viewport_width(width);
            let outcome = marquee.handle_resize();
            if !outcome.is_satisfied() {
                warn!(
                    "Marquee track still narrower than the target after {} passes",
                    outcome.passes()
                );
            }
        }
        info!("Viewport resized to {}x{}", width, height);
        Ok(())
    }

    /// One frame: smooth the arc offset and lay out every card, then scroll the marquee.
    fn tick_frame(&mut self, now: Instant) {
        if let Some(arc) = self.arc.as_mut() {
            self.frame = arc.tick();
        }

        let dt = self
            .last_frame_at
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or_default();
        self.last_frame_at = Some(now);

        if let Some(marquee) = self.marquee.as_mut() {
            let position = marquee.tick(now);
            trace!("Frame: {} cards, marquee at {:.1}", self.frame.len(), position);

            for item in marquee.media().playing_items() {
                if marquee.media().state(item) != PlaybackState::Playing {
                    continue;
                }
                if let Some(media) = marquee.surface_mut().media_mut(item) {
                    media.advance(dt.as_secs_f64());
                }
            }
        }
    }

    fn tick_pagination(&mut self) {
        if let Some(marquee) = self.marquee.as_mut() {
            if marquee.sync_pagination() {
                debug!("Active dot -> {}", marquee.active_index());
            }
        }
    }

    /// Feed back the result of a playback task.
    fn settle_playback(&mut self, epoch: u64, ticket: PlayTicket, result: Result<(), MediaError>) {
        if epoch != self.epoch {
            debug!("Dropping playback result from an earlier mount");
            return;
        }
        let Some(marquee) = self.marquee.as_mut() else {
            return;
        };
        if let Err(e) = &result {
            warn!("Playback start for item {} failed: {}", ticket.item, e);
        }
        if marquee.settle_playback(ticket, result) == PlaybackState::Playing {
            if let Some(media) = marquee.surface_mut().media_mut(ticket.item) {
                media.resume();
            }
        }
    }

    fn take_playback_requests(&mut self) -> Vec<PlaybackRequest> {
        std::mem::take(&mut self.pending_playback)
    }

    fn take_stopped_items(&mut self) -> Vec<ItemId> {
        std::mem::take(&mut self.stopped_items)
    }
}

/// Spawn a periodic driver that sends `event()` every `period`.
fn spawn_driver(
    period: Duration,
    tx: mpsc::Sender<DaemonEvent>,
    event: fn() -> DaemonEvent,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if tx.send(event()).await.is_err() {
                break; // Channel closed
            }
        }
    })
}

/// Start playback for one item. Aborting the task drops the result.
fn spawn_playback(request: PlaybackRequest, tx: mpsc::Sender<DaemonEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(PLAYBACK_START_LATENCY).await;
        let result = simulate_play(request.source.as_deref());
        let _ = tx
            .send(DaemonEvent::PlaybackSettled {
                epoch: request.epoch,
                ticket: request.ticket,
                result,
            })
            .await;
    })
}

/// Run the IPC server, accepting connections and dispatching commands.
async fn run_ipc_server(listener: TcpListener, event_tx: mpsc::Sender<DaemonEvent>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failed to accept client connection: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        debug!("Client connected from {}", peer);

        let event_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, event_tx).await {
                warn!("Client handler error: {}", e);
            }
        });
    }
}

/// Serialize a response line, falling back to a fixed error line.
fn response_line(response: &IpcResponse) -> String {
    match encode_line(response) {
        Ok(line) => line,
        Err(e) => {
            warn!("Failed to serialize IPC response: {}", e);
            "{\"status\":\"error\",\"message\":\"Internal serialization error\"}\n".to_string()
        }
    }
}

/// Handle a single client connection.
async fn handle_client<S>(stream: S, event_tx: mpsc::Sender<DaemonEvent>) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let limited_reader = reader.take(MAX_IPC_MESSAGE_SIZE as u64);
    let mut reader = BufReader::new(limited_reader);
    let mut line = String::new();

    // Read command (single line of JSON) with timeout and size bound
    let read_result = tokio::time::timeout(IPC_READ_TIMEOUT, reader.read_line(&mut line)).await;
    let bytes_read = match read_result {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Ok(()), // Client did not send in time
    };
    if bytes_read == 0 {
        return Ok(()); // Client disconnected
    }

    debug!("Received command: {}", line.trim());

    let cmd: IpcCommand = match decode_line(&line) {
        Ok(cmd) => cmd,
        Err(e) => {
            let response = IpcResponse::error(format!("Invalid command: {}", e));
            writer.write_all(response_line(&response).as_bytes()).await?;
            return Ok(());
        }
    };

    let is_stop = matches!(cmd, IpcCommand::Stop);

    let (resp_tx, resp_rx) = oneshot::channel();
    if event_tx
        .send(DaemonEvent::IpcCommand {
            cmd,
            responder: resp_tx,
        })
        .await
        .is_err()
    {
        let response = IpcResponse::error("Daemon is shutting down");
        writer.write_all(response_line(&response).as_bytes()).await?;
        return Ok(());
    }

    let response = match resp_rx.await {
        Ok(resp) => resp,
        Err(_) => IpcResponse::error("Failed to get response from daemon"),
    };
    writer.write_all(response_line(&response).as_bytes()).await?;
    writer.flush().await?;

    if is_stop {
        let _ = event_tx.send(DaemonEvent::Shutdown).await;
    }

    Ok(())
}

/// Check if another daemon instance is already listening.
async fn check_already_running() -> bool {
    TcpStream::connect(IPC_ADDR).await.is_ok()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration first (needed for log level)
    let mut config = Config::load().unwrap_or_else(|e| {
        // Can't use tracing yet, fall back to eprintln
        eprintln!("Failed to load configuration: {}. Using defaults.", e);
        Config::default()
    });
    let config_warnings = config.validate();

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.behavior.log_level.to_lowercase()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    for w in &config_warnings {
        warn!("Config: {} - {}", w.field, w.message);
    }

    info!("Showreel daemon starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if check_already_running().await {
        error!("Another showreel daemon is already running on {}", IPC_ADDR);
        return Ok(());
    }

    let listener = TcpListener::bind(IPC_ADDR)
        .await
        .with_context(|| format!("Failed to bind IPC address {}", IPC_ADDR))?;

    info!(
        "Configuration loaded: viewport={}x{}, reduced_motion={}, log_level={}",
        config.viewport.width,
        config.viewport.height,
        config.motion.prefers_reduced_motion,
        config.behavior.log_level
    );

    let mut state = AppState::new_with_config(config, Instant::now());

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(100);

    let ipc_handle = tokio::spawn(run_ipc_server(listener, event_tx.clone()));
    info!("IPC server listening on {}", IPC_ADDR);

    // Install Ctrl+C handler so terminal kill triggers graceful shutdown
    {
        let shutdown_tx = event_tx.clone();
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("Ctrl+C received, initiating shutdown...");
                let _ = shutdown_tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    let mut frame_driver = spawn_driver(state.frame_period(), event_tx.clone(), || {
        DaemonEvent::FrameTick
    });
    let mut pagination_driver = spawn_driver(state.pagination_period(), event_tx.clone(), || {
        DaemonEvent::PaginationTick
    });

    // In-flight playback starts, keyed by item, with the ticket generation.
    let mut playback_tasks: HashMap<ItemId, (u64, JoinHandle<()>)> = HashMap::new();

    info!("Ready. Use showreel-cli to send commands.");

    while let Some(event) = event_rx.recv().await {
        match event {
            DaemonEvent::IpcCommand { cmd, responder } => {
                let is_reload = matches!(cmd, IpcCommand::Reload);
                let response = state.handle_command(cmd, Instant::now());
                let reloaded = is_reload && matches!(response, IpcResponse::Ok);

                if responder.send(response).is_err() {
                    debug!("Client disconnected before receiving IPC response");
                }

                if reloaded {
                    for (_, (_, handle)) in playback_tasks.drain() {
                        handle.abort();
                    }
                    frame_driver.abort();
                    pagination_driver.abort();
                    frame_driver = spawn_driver(state.frame_period(), event_tx.clone(), || {
                        DaemonEvent::FrameTick
                    });
                    pagination_driver =
                        spawn_driver(state.pagination_period(), event_tx.clone(), || {
                            DaemonEvent::PaginationTick
                        });
                    info!("Drivers restarted after config reload");
                }

                for item in state.take_stopped_items() {
                    if let Some((_, handle)) = playback_tasks.remove(&item) {
                        handle.abort();
                        debug!("Cancelled pending playback start for item {}", item);
                    }
                }

                for request in state.take_playback_requests() {
                    let item = request.ticket.item;
                    let generation = request.ticket.generation;
                    let handle = spawn_playback(request, event_tx.clone());
                    if let Some((_, old)) = playback_tasks.insert(item, (generation, handle)) {
                        old.abort();
                    }
                }
            }
            DaemonEvent::FrameTick => {
                state.tick_frame(Instant::now());
            }
            DaemonEvent::PaginationTick => {
                state.tick_pagination();
            }
            DaemonEvent::PlaybackSettled {
                epoch,
                ticket,
                result,
            } => {
                if playback_tasks
                    .get(&ticket.item)
                    .is_some_and(|(generation, _)| *generation == ticket.generation)
                {
                    playback_tasks.remove(&ticket.item);
                }
                state.settle_playback(epoch, ticket, result);
            }
            DaemonEvent::Shutdown => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    frame_driver.abort();
    pagination_driver.abort();
    for (_, (_, handle)) in playback_tasks {
        handle.abort();
    }
    ipc_handle.abort();

    info!("Showreel daemon shutting down.");
    Ok(())
}
