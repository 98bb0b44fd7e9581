//! Service context bundling the resolved settings with every port.

use std::path::Path;

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::directory::LdapDirectory;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::adapters::memory::CountingClock;
use crate::adapters::recording::RecordingDirectory;
use crate::adapters::replaying::ReplayingDirectory;
use crate::cassette::format::Cassette;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::session::RecordingSession;
use crate::config::{LdapConfig, Settings};
use crate::error::{Error, Result};
use crate::ports::clock::Clock;
use crate::ports::directory::Directory;
use crate::ports::filesystem::FileSystem;

/// Everything a component needs to talk to the outside world.
///
/// Constructors wire up different adapter sets (live, recording, replaying);
/// tests build one from memory adapters with [`ServiceContext::new`].
pub struct ServiceContext {
    /// Resolved configuration.
    pub settings: Settings,
    /// Filesystem holding the flat-file maps.
    pub fs: Box<dyn FileSystem>,
    /// Directory-service client.
    pub directory: Box<dyn Directory>,
    /// Clock for the replication settle delay.
    pub clock: Box<dyn Clock>,
}

impl ServiceContext {
    /// Assembles a context from explicit adapters.
    #[must_use]
    pub fn new(
        settings: Settings,
        fs: Box<dyn FileSystem>,
        directory: Box<dyn Directory>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self { settings, fs, directory, clock }
    }

    /// Connects to the configured directory server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the connection or bind fails.
    pub fn live(settings: Settings, ldap: &LdapConfig) -> Result<Self> {
        let directory =
            LdapDirectory::connect(ldap).map_err(|e| Error::directory(ldap.url.clone(), e))?;
        Ok(Self::new(settings, Box::new(LiveFileSystem), Box::new(directory), Box::new(LiveClock)))
    }

    /// Connects to the directory and records every call to a cassette.
    ///
    /// Drop the context before calling [`RecordingSession::finish`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Directory`] if the connection or bind fails.
    pub fn recording(
        settings: Settings,
        ldap: &LdapConfig,
        path: &Path,
    ) -> Result<(Self, RecordingSession)> {
        let session = RecordingSession::new(path, &settings.am_container);
        let live = Self::live(settings, ldap)?;
        let directory =
            RecordingDirectory::new(live.directory, std::sync::Arc::clone(&session.directory));
        let ctx = Self::new(live.settings, live.fs, Box::new(directory), live.clock);
        Ok((ctx, session))
    }

    /// Serves directory calls from a cassette. Flat files are still read
    /// from disk; the settle delay is skipped since nothing replicates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the cassette cannot be loaded.
    pub fn replaying(settings: Settings, cassette: &Path) -> Result<Self> {
        let cassette = Cassette::load(cassette).map_err(Error::Config)?;
        let directory = ReplayingDirectory::new(CassetteReplayer::new(&cassette));
        Ok(Self::new(
            settings,
            Box::new(LiveFileSystem),
            Box::new(directory),
            Box::new(CountingClock::new()),
        ))
    }

    /// Waits out directory replication after a mutation.
    pub fn settle(&self) {
        let wait = self.settings.replication_wait;
        tracing::debug!(seconds = wait.as_secs_f64(), "waiting for replication");
        self.clock.sleep(wait);
    }
}
