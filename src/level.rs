// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-gelf.
//
// tracing-gelf is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tracing-gelf is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-gelf.  If
// not, see <http://www.gnu.org/licenses/>.

//! Application log levels & syslog severities.
//!
//! GELF carries the [syslog] severity of each message in its `level` field. Applications, however,
//! tend to speak in terms of their own levels ("warning", "info", ...). [`LogLevel`] models the
//! latter as an open-ended ordinal (larger is more severe), and [`LogLevel::to_gelf`] maps it onto
//! the former via a fixed table.
//!
//! [syslog]: https://datatracker.ietf.org/doc/html/rfc5424#section-6.2.1

type StdResult<T, E> = std::result::Result<T, E>;

/// RFC [5424] defines eight severity levels for messages. The enumeration values duplicate the
/// constants documented as per the `syslog()` manual [page] & defined in `<syslog.h>`; GELF
/// re-uses them as-is.
///
/// [5424]: https://datatracker.ietf.org/doc/html/rfc5424
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// system is unusable
    LOG_EMERG,
    /// action must be take immediately
    LOG_ALERT,
    /// critical conditions
    LOG_CRIT,
    /// error conditions
    LOG_ERR,
    /// warning conditions
    LOG_WARNING,
    /// normal, but significant condition
    LOG_NOTICE,
    /// informational message
    LOG_INFO,
    /// debug-level message
    LOG_DEBUG,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Severity::LOG_EMERG => "LOG_EMERG",
                Severity::LOG_ALERT => "LOG_ALERT",
                Severity::LOG_CRIT => "LOG_CRIT",
                Severity::LOG_ERR => "LOG_ERR",
                Severity::LOG_WARNING => "LOG_WARNING",
                Severity::LOG_NOTICE => "LOG_NOTICE",
                Severity::LOG_INFO => "LOG_INFO",
                Severity::LOG_DEBUG => "LOG_DEBUG",
            }
        )
    }
}

/// An application log level.
///
/// The well-known levels are provided as associated constants; any other ordinal is legal, and
/// will be passed through to the GELF `level` field unchanged.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogLevel(pub u32);

impl LogLevel {
    pub const NOTSET: LogLevel = LogLevel(0);
    pub const TRACE: LogLevel = LogLevel(5);
    pub const DEBUG: LogLevel = LogLevel(10);
    pub const INFO: LogLevel = LogLevel(20);
    pub const WARNING: LogLevel = LogLevel(30);
    pub const ERROR: LogLevel = LogLevel(40);
    pub const CRITICAL: LogLevel = LogLevel(50);

    /// The syslog severity for this level, if it has one.
    pub fn severity(&self) -> Option<Severity> {
        match *self {
            LogLevel::CRITICAL => Some(Severity::LOG_CRIT),
            LogLevel::ERROR => Some(Severity::LOG_ERR),
            LogLevel::WARNING => Some(Severity::LOG_WARNING),
            LogLevel::INFO => Some(Severity::LOG_INFO),
            LogLevel::DEBUG => Some(Severity::LOG_DEBUG),
            _ => None,
        }
    }

    /// The value for the GELF `level` field: the mapped syslog severity, or the raw ordinal for
    /// levels outside the table.
    pub fn to_gelf(&self) -> u32 {
        self.severity().map(|s| s as u32).unwrap_or(self.0)
    }

    /// Human-readable name, as used for the `level_name` field
    pub fn name(&self) -> String {
        match *self {
            LogLevel::CRITICAL => "CRITICAL".to_owned(),
            LogLevel::ERROR => "ERROR".to_owned(),
            LogLevel::WARNING => "WARNING".to_owned(),
            LogLevel::INFO => "INFO".to_owned(),
            LogLevel::DEBUG => "DEBUG".to_owned(),
            LogLevel::TRACE => "TRACE".to_owned(),
            LogLevel::NOTSET => "NOTSET".to_owned(),
            LogLevel(n) => format!("Level {}", n),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.name())
    }
}

impl std::convert::From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match level {
            &tracing::Level::TRACE => LogLevel::TRACE,
            &tracing::Level::DEBUG => LogLevel::DEBUG,
            &tracing::Level::INFO => LogLevel::INFO,
            &tracing::Level::WARN => LogLevel::WARNING,
            &tracing::Level::ERROR => LogLevel::ERROR,
        }
    }
}
