//! GTP Runtime - Engine lifecycle, connection, and session registry
//!
//! This crate drives Go engines that speak the Go Text Protocol over stdio:
//!
//! - **Driver**: Resolving how the engine is launched (executable, model, config)
//! - **Process**: Spawning the engine and supervising its lifetime
//! - **Transport**: Line-oriented communication over stdio pipes
//! - **Connection**: Identifier assignment and reply correlation
//! - **Registry**: One engine per game id
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   gtp-cli    │  Host (interactive play, NDJSON batch)
//! └──────┬───────┘
//!        │ game flows
//! ┌──────▼───────┐
//! │  gtp-runtime │  This crate
//! │  ┌────────┐  │
//! │  │Registry│  │  game id -> GtpClient
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Conn   │  │  "N cmd" / "=N payload" correlation
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │ Trans  │  │  stdin/stdout lines
//! │  └────────┘  │
//! │  ┌────────┐  │
//! │  │Process │  │  engine subprocess
//! │  └────────┘  │
//! └──────────────┘
//! ```

pub mod client;
pub mod connection;
pub mod driver;
pub mod error;
pub mod game;
pub mod process;
pub mod registry;
pub mod settings;
pub mod transport;

// Re-export key types at crate root
pub use client::GtpClient;
pub use connection::{Connection, PendingReply, Readiness};
pub use driver::EngineConfig;
pub use error::{Error, Result};
pub use game::{MoveOutcome, engine_move, play_move, start_game};
pub use process::EngineProcess;
pub use registry::{EngineFactory, ProcessFactory, SessionRegistry};
pub use settings::{BOARD_SIZE, Difficulty, GameSettings};
pub use transport::{PipeTransport, PipeTransportReceiver, PipeTransportSender, Transport, TransportParts, TransportReceiver};
