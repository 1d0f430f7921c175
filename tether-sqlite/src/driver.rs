use crate::{SqliteConnection, SqliteDialect};
use rusqlite::OpenFlags;
use std::borrow::Cow;
use tether_core::{Connection, Context, Dialect, Driver, Error, Result};

/// Opens a connection to the database file for every operation.
///
/// The url has the form `sqlite://<path>[?mode=ro|rw|rwc]`, the path percent decoded.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    path: String,
    flags: OpenFlags,
}

impl SqliteDriver {
    pub const PREFIX: &'static str = "sqlite://";

    pub fn new<'a>(url: impl Into<Cow<'a, str>>) -> Result<Self> {
        let url = url.into();
        let Some(rest) = url.strip_prefix(Self::PREFIX) else {
            let error = Error::msg(format!(
                "Expected sqlite connection url to start with `{}`",
                Self::PREFIX
            ));
            log::error!("{:#}", error);
            return Err(error);
        };
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        let path = urlencoding::decode(path)
            .with_context(|| format!("Error while decoding connection URL: `{}`", url))?
            .into_owned();
        if path.is_empty() {
            return Err(Error::msg(format!("The url `{}` names no database file", url)));
        }
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        for (key, value) in query
            .split('&')
            .filter(|v| !v.is_empty())
            .map(|v| v.split_once('=').unwrap_or((v, "")))
        {
            flags = match (key, value) {
                ("mode", "ro") => OpenFlags::SQLITE_OPEN_READ_ONLY,
                ("mode", "rw") => OpenFlags::SQLITE_OPEN_READ_WRITE,
                ("mode", "rwc") => OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
                _ => {
                    let error = Error::msg(format!(
                        "Unsupported option `{}={}` in the sqlite url `{}`",
                        key, value, url
                    ));
                    log::error!("{:#}", error);
                    return Err(error);
                }
            };
        }
        log::info!("SQLite database at `{}`", path);
        Ok(Self {
            path,
            flags: flags | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Driver for SqliteDriver {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(SqliteConnection::open(&self.path, self.flags)?))
    }
}
