// Copyright 2025 Axon Contributors
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

//! Storage-layer errors.

use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("trace not found: {0}")]
    TraceNotFound(String),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("invalid stored node payload: {0}")]
    Decode(String),
}
