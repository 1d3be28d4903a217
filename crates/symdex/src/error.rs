// Copyright 2025 Symdex Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error as StdError;
use std::fmt::{self, Display};

/// Typed errors surfaced at the store and search boundaries.
#[derive(Debug)]
pub enum Error {
    /// Store open/read/commit or query-execution problem; carries the
    /// underlying message.
    DatabaseFailure(String),
    /// A store directory lacks required metadata or does not exist.
    InvalidManifest(String),
    /// Malformed query text; carries the parser's message.
    InvalidQuery(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DatabaseFailure(s) => write!(f, "database failure: {}", s),
            Error::InvalidManifest(s) => write!(f, "invalid manifest: {}", s),
            Error::InvalidQuery(s) => write!(f, "invalid query: {}", s),
        }
    }
}

impl StdError for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::DatabaseFailure(e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::DatabaseFailure(e.to_string())
    }
}
