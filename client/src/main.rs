use clap::Parser;
use client::config::{ClientConfig, IdentitySource, RendererKind, TransportKind};
use client::dispatch::Dispatcher;
use client::game::{Event, GameState};
use client::input::InputHandler;
use client::rendering::{draw_status, MacroquadSurface, SpatialRenderer, TextGridRenderer};
use client::session::{spawn_session, InputGate, SessionHandle};
use log::{info, warn};
use macroquad::prelude::{next_frame, Conf};
use macroquad::Window;
use shared::MoveCommand;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Game server address (host:port)
    #[arg(short = 's', long, default_value = client::config::DEFAULT_SERVER)]
    server: String,

    /// How moves and snapshots travel
    #[arg(short = 't', long, value_enum, default_value = "streaming")]
    transport: TransportKind,

    /// How the board is drawn
    #[arg(short = 'r', long, value_enum, default_value = "spatial")]
    renderer: RendererKind,

    /// Player colour; defaults to White
    #[arg(short = 'c', long)]
    color: Option<String>,

    /// Where the player identity comes from
    #[arg(short = 'i', long, value_enum, default_value = "color")]
    identity: IdentitySource,

    /// Do not call the auth endpoint before connecting
    #[arg(long)]
    skip_auth: bool,

    /// Reuse an existing session id instead of asking for a new one
    #[arg(long)]
    session_token: Option<String>,

    /// Capacity of the outbound move queue
    #[arg(long, default_value_t = client::config::DEFAULT_COMMAND_BUFFER)]
    command_buffer: usize,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: i32,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "800")]
    height: i32,
}

impl Args {
    fn window_conf(&self) -> Conf {
        Conf {
            window_title: "Grid World".to_string(),
            window_width: self.width,
            window_height: self.height,
            ..Default::default()
        }
    }

    fn into_config(self) -> ClientConfig {
        ClientConfig {
            server: self.server,
            transport: self.transport,
            renderer: self.renderer,
            color: self.color,
            identity: self.identity,
            skip_auth: self.skip_auth,
            session_token: self.session_token,
            command_buffer: self.command_buffer,
            ..ClientConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let window = args.window_conf();
    let config = args.into_config();

    info!("Starting client...");
    info!("Server: {} ({:?} transport)", config.server, config.transport);
    info!("Controls: arrow keys to move");

    let session = spawn_session(config.clone())?;
    Window::from_config(window, run(config, session));

    Ok(())
}

async fn run(config: ClientConfig, session: SessionHandle) {
    let SessionHandle {
        mut events,
        commands,
        status: status_rx,
    } = session;

    let mut dispatcher = Dispatcher::new(GameState::default());
    match config.renderer {
        RendererKind::Spatial => {
            dispatcher.subscribe(Box::new(SpatialRenderer::new(MacroquadSurface)))
        }
        RendererKind::Text => {
            dispatcher.subscribe(Box::new(TextGridRenderer::new(MacroquadSurface)))
        }
    }
    dispatcher.dispatch(Event::PlayerIdentitySelected {
        color: config.initial_identity(),
    });

    let mut input: Option<InputHandler<Box<dyn FnMut(MoveCommand)>>> = None;
    let mut overlay = MacroquadSurface;

    loop {
        // Read the status before draining: anything sent ahead of `Open`
        // (e.g. the session identity) is then already in the queue.
        let status = status_rx.borrow().clone();
        if dispatcher.drain(&mut events) == 0 {
            dispatcher.redraw();
        }

        match InputGate::decide(&status, input.is_some()) {
            InputGate::Attach => {
                let actor = dispatcher.state().player.clone();
                info!("Input attached for {}", actor);
                let commands = commands.clone();
                input = Some(InputHandler::attach(
                    Box::new(move |command| {
                        commands.forward(command);
                    }),
                    actor,
                ));
            }
            InputGate::Detach => {
                input = None;
                warn!("Input detached: {}", status);
            }
            InputGate::Keep => {}
        }

        if let Some(handler) = input.as_mut() {
            handler.poll();
        }

        draw_status(&mut overlay, &status);
        next_frame().await;
    }
}
