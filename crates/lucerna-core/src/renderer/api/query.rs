// Copyright 2025 eraflo
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

//! Timestamp query sets.

/// An opaque handle to a set of timestamp queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuerySetId(pub usize);

/// Describes a timestamp query set.
#[derive(Debug, Clone)]
pub struct QuerySetDescriptor<'a> {
    /// Optional debug label.
    pub label: Option<&'a str>,
    /// Number of timestamps in the set.
    pub count: u32,
}

/// Size in bytes of one resolved timestamp.
pub const TIMESTAMP_SIZE: u64 = 8;
