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

//! Axon Tools
//!
//! External tool resolution, geocoding, and transcript grounding — the
//! pieces of the replay engine that talk to the outside world.

pub mod calculator;
pub mod fetch;
pub mod geocode;
pub mod grounder;
pub mod providers;
pub mod registry;
pub mod weather;

pub use geocode::{Geocoder, LatLon};
pub use grounder::TranscriptGrounder;
pub use providers::ToolProviders;
pub use registry::ToolRegistry;
