//! # sprite-group CLI
//!
//! Command-line interface for the sprite variant grouper.
//!
//! ## Usage
//! ```bash
//! sprite-group run
//! sprite-group run --agg-threshold 0.09 --debug
//! sprite-group settings show
//! ```

mod cli;

use sprite_variant_grouper::Result;

fn main() -> Result<()> {
    cli::run()
}
