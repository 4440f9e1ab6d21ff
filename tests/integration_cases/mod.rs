// Copyright 2020 TiKV Project Authors. Licensed under Apache-2.0.

mod test_inflight;
mod test_member_change;
