// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod chart;
pub mod format;
pub mod session;

pub use chart::*;
pub use format::*;
pub use session::*;
