//! Line protocol session state.
//!
//! Holds the engine between commands and writes every response to a caller
//! supplied writer, so the same handlers serve stdout and tests.

use std::io::{self, Write};

use serde::Serialize;
use tracing::warn;

use crate::config::EngineConfig;
use crate::engine::ConquestEngine;
use crate::error::ConquestError;
use crate::protocol::parser::Command;
use crate::store::{MemoryStore, TerritoryRecord, TerritoryStore};
use crate::territory::{Territory, User, UserId};

/// One protocol session over an in-memory store.
pub struct Session {
    engine: ConquestEngine<MemoryStore>,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(EngineConfig::default())
    }
}

fn write_json<W: Write, T: Serialize>(out: &mut W, tag: &str, value: &T) -> io::Result<()> {
    write!(out, "{} ", tag)?;
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)
}

fn write_error<W: Write>(out: &mut W, kind: &str, message: impl std::fmt::Display) -> io::Result<()> {
    writeln!(out, "error {} {}", kind, message)
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Session {
            engine: ConquestEngine::new(MemoryStore::new(), config),
        }
    }

    pub fn engine(&self) -> &ConquestEngine<MemoryStore> {
        &self.engine
    }

    /// Runs one command. Returns `false` once the session should end.
    pub fn dispatch<W: Write>(&mut self, command: Command, out: &mut W) -> io::Result<bool> {
        match command {
            Command::IsReady => self.handle_isready(out)?,
            Command::Options => self.handle_options(out)?,
            Command::SetOption { name, value } => self.handle_setoption(&name, value.as_deref(), out)?,
            Command::User { id, color, name } => self.handle_user(id, name, color, out)?,
            Command::Route {
                user,
                distance_m,
                duration_s,
                payload,
            } => self.handle_route(user, distance_m, duration_s, &payload, out)?,
            Command::Territory { user } => self.handle_territory(user, out)?,
            Command::Stats { user } => self.handle_stats(user, out)?,
            Command::Save { path } => self.handle_save(&path, out)?,
            Command::Load { path } => self.handle_load(&path, out)?,
            Command::Quit => return Ok(false),
        }
        out.flush()?;
        Ok(true)
    }

    pub fn handle_isready<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "readyok")
    }

    pub fn handle_options<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.engine.config().describe(out)?;
        writeln!(out, "optionsok")
    }

    pub fn handle_setoption<W: Write>(&mut self, name: &str, value: Option<&str>, out: &mut W) -> io::Result<()> {
        if let Err(e) = self.engine.config_mut().set_option(name, value) {
            warn!(error = %e, "setoption rejected");
            write_error(out, "invalid_option", e)?;
        }
        Ok(())
    }

    pub fn handle_user<W: Write>(&self, id: UserId, name: String, color: String, out: &mut W) -> io::Result<()> {
        match self.engine.store().register_user(User::new(id, name, color)) {
            Ok(()) => writeln!(out, "ok"),
            Err(e) => write_error(out, "store", e),
        }
    }

    pub fn handle_route<W: Write>(
        &self,
        user: UserId,
        distance_m: f64,
        duration_s: f64,
        payload: &str,
        out: &mut W,
    ) -> io::Result<()> {
        match self.engine.process_payload(user, payload, distance_m, duration_s) {
            Ok(result) => write_json(out, "conquest", &result),
            Err(e) => write_error(out, e.kind(), e),
        }
    }

    fn known_user(&self, user: UserId) -> Result<User, ConquestError> {
        self.engine
            .store()
            .user(user)?
            .ok_or(ConquestError::UnknownUser(user))
    }

    pub fn handle_territory<W: Write>(&self, user: UserId, out: &mut W) -> io::Result<()> {
        let territory = self.known_user(user).and_then(|_| {
            Ok(self
                .engine
                .store()
                .territory(user)?
                .unwrap_or_else(|| Territory::unclaimed(user)))
        });
        match territory {
            Ok(t) => write_json(out, "territory", &TerritoryRecord::from(&t)),
            Err(e) => write_error(out, e.kind(), e),
        }
    }

    pub fn handle_stats<W: Write>(&self, user: UserId, out: &mut W) -> io::Result<()> {
        let stats = self
            .known_user(user)
            .and_then(|_| Ok(self.engine.store().stats(user)?));
        match stats {
            Ok(s) => write_json(out, "stats", &s),
            Err(e) => write_error(out, e.kind(), e),
        }
    }

    pub fn handle_save<W: Write>(&self, path: &str, out: &mut W) -> io::Result<()> {
        match self.engine.store().save(path) {
            Ok(()) => writeln!(out, "ok"),
            Err(e) => write_error(out, "store", e),
        }
    }

    pub fn handle_load<W: Write>(&self, path: &str, out: &mut W) -> io::Result<()> {
        match self.engine.store().load(path) {
            Ok(()) => writeln!(out, "ok"),
            Err(e) => write_error(out, "store", e),
        }
    }
}
