//! dexgrid - creature catalog browser

use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventBus, EventKind,
    EventRoutingState, HandlerResponse, Keybindings, TaskKey,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use dexgrid::action::Action;
use dexgrid::api::{self, HttpSource, SharedSource};
use dexgrid::config::{CatalogConfig, DEFAULT_BASE_URL, DEFAULT_CATALOG_LIMIT, DEFAULT_PAGE_SIZE};
use dexgrid::effect::Effect;
use dexgrid::reducer::reducer;
use dexgrid::state::AppState;
use dexgrid::ui::{self, CatalogUi};

#[derive(Parser, Debug)]
#[command(name = "dexgrid")]
#[command(about = "Browse, search and filter the creature catalog")]
struct Args {
    /// Upstream API root
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Number of index entries to load
    #[arg(
        long,
        default_value_t = DEFAULT_CATALOG_LIMIT as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    limit: u64,

    /// Cards per page
    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    page_size: u64,

    /// Directory for cached HTTP responses
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Always hit the network
    #[arg(long)]
    no_cache: bool,

    /// Log file (defaults to dexgrid.log in the cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

#[derive(tui_dispatch::ComponentId, Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum CatalogComponentId {
    Grid,
    Search,
}

#[derive(tui_dispatch::BindingContext, Clone, Copy, PartialEq, Eq, Hash)]
enum CatalogContext {
    Grid,
    Search,
}

impl EventRoutingState<CatalogComponentId, CatalogContext> for AppState {
    fn focused(&self) -> Option<CatalogComponentId> {
        if self.search_active {
            Some(CatalogComponentId::Search)
        } else {
            Some(CatalogComponentId::Grid)
        }
    }

    fn modal(&self) -> Option<CatalogComponentId> {
        if self.search_active {
            Some(CatalogComponentId::Search)
        } else {
            None
        }
    }

    fn binding_context(&self, id: CatalogComponentId) -> CatalogContext {
        match id {
            CatalogComponentId::Grid => CatalogContext::Grid,
            CatalogComponentId::Search => CatalogContext::Search,
        }
    }

    fn default_context(&self) -> CatalogContext {
        CatalogContext::Grid
    }
}

/// Shared by every effect task.
struct EffectEnv {
    source: SharedSource,
    base_url: String,
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    let cache_root = args.cache_dir.clone().unwrap_or_else(api::default_cache_dir);
    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| cache_root.join("dexgrid.log"));
    setup_tracing(&log_path);

    let config = CatalogConfig {
        catalog_limit: args.limit as usize,
        page_size: args.page_size as usize,
        ..CatalogConfig::default()
    }
    .with_base_url(args.base_url.as_str());
    let http_cache = if args.no_cache { None } else { Some(cache_root) };
    info!(base_url = %config.base_url, cache = ?http_cache, "starting dexgrid");

    let env = Arc::new(EffectEnv {
        source: Arc::new(HttpSource::new(http_cache)),
        base_url: config.base_url.clone(),
    });

    let debug = DebugSession::new(args.debug);
    let state = debug
        .load_state_or_else_async(move || async move {
            Ok::<AppState, io::Error>(AppState::new(config))
        })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, env).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

/// The terminal belongs to the UI, so logs go to a file. Without one there is no subscriber.
fn setup_tracing(log_path: &Path) {
    use std::fs::OpenOptions;

    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("DEXGRID_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
    info!(path = ?log_path, "tracing initialized");
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    env: Arc<EffectEnv>,
) -> io::Result<DebugRunOutput<AppState>> {
    let ui = Rc::new(RefCell::new(CatalogUi::new()));
    let mut bus: EventBus<AppState, Action, CatalogComponentId, CatalogContext> =
        EventBus::new();
    let keybindings: Keybindings<CatalogContext> = Keybindings::new();

    bus.register(CatalogComponentId::Grid, |event, state| {
        ui::handle_grid_event(&event.kind, state)
    });
    bus.register(CatalogComponentId::Search, |event, state| {
        ui::handle_search_event(&event.kind, state)
    });

    bus.register_global(|event, state| match event.kind {
        EventKind::Resize(width, height) => {
            HandlerResponse::action(Action::UiTerminalResize(width, height)).with_render()
        }
        EventKind::Key(key) => match key.code {
            crossterm::event::KeyCode::Char('q') if !state.search_active => {
                HandlerResponse::action(Action::Quit)
            }
            _ => HandlerResponse::ignored(),
        },
        _ => HandlerResponse::ignored(),
    });

    debug
        .run_effect_app_with_bus(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(120), || Action::Tick);
            },
            &mut bus,
            &keybindings,
            |frame, area, state, _render_ctx, event_ctx| {
                let regions = ui::layout(area);
                event_ctx.set_component_area(CatalogComponentId::Grid, regions.grid);
                if state.search_active {
                    event_ctx.set_component_area(CatalogComponentId::Search, regions.header);
                } else {
                    event_ctx
                        .component_areas
                        .remove(&CatalogComponentId::Search);
                }
                ui.borrow_mut().render(frame, area, state);
            },
            |action| matches!(action, Action::Quit),
            move |effect, ctx| handle_effect(effect, ctx, Arc::clone(&env)),
        )
        .await
}

fn handle_effect(effect: Effect, ctx: &mut EffectContext<Action>, env: Arc<EffectEnv>) {
    match effect {
        Effect::LoadListing { generation, limit } => {
            ctx.tasks().spawn(TaskKey::new("listing"), async move {
                match api::fetch_catalog_index(env.source.as_ref(), &env.base_url, limit)
                    .await
                {
                    Ok(entries) => Action::ListingDidLoad {
                        generation,
                        entries,
                    },
                    Err(err) => Action::ListingDidError {
                        generation,
                        error: err.to_string(),
                    },
                }
            });
        }
        Effect::EnrichCatalog {
            generation,
            entries,
        } => {
            ctx.tasks().spawn(TaskKey::new("catalog"), async move {
                let enrichment = api::enrich(Arc::clone(&env.source), &entries).await;
                Action::CatalogDidLoad {
                    generation,
                    records: enrichment.records,
                    failed: enrichment.failed,
                }
            });
        }
        Effect::LoadStats { id } => {
            let key = format!("stats_{id}");
            ctx.tasks().spawn(TaskKey::new(key), async move {
                match api::fetch_detail_by_id(env.source.as_ref(), &env.base_url, id).await
                {
                    Ok(record) => Action::StatsDidLoad {
                        id,
                        stats: record.stats,
                    },
                    Err(err) => Action::StatsDidError {
                        id,
                        error: err.to_string(),
                    },
                }
            });
        }
    }
}
