// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

mod inflight;
pub use self::inflight::*;
mod quorum;
pub use self::quorum::*;
