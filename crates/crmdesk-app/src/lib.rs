// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod filters;
pub mod forms;
pub mod ids;
pub mod model;
pub mod navigation;
pub mod state;
pub mod tags;

pub use filters::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use navigation::*;
pub use state::*;
pub use tags::*;
