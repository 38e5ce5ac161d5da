//! Seeded uneven terrain for walking tests.

use rand::Rng;
use skitter_core::ground::{Plate, PlateGround};

use crate::rng::seeded_rng;

/// Square patch of stepped terrain centred on the origin.
///
/// A base plate at height zero covers `[-extent, extent]` on both axes so
/// no ray over the patch misses. On top of it, roughly half of the
/// `cell`-sized grid squares get a raised plate with a height in
/// `(0, max_height]`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rough_terrain(seed: u64, extent: f32, cell: f32, max_height: f32) -> PlateGround {
    let mut rng = seeded_rng(seed);
    let mut ground = PlateGround::default().with_plate(Plate {
        min: [-extent, -extent],
        max: [extent, extent],
        height: 0.0,
        layer: 0,
    });

    let cells = (2.0 * extent / cell).floor() as usize;
    for i in 0..cells {
        for j in 0..cells {
            if !rng.random_bool(0.5) {
                continue;
            }
            let x = -extent + i as f32 * cell;
            let y = -extent + j as f32 * cell;
            let height = max_height * (1.0 - rng.random::<f32>());
            ground = ground.with_plate(Plate {
                min: [x, y],
                max: [x + cell, y + cell],
                height,
                layer: 0,
            });
        }
    }
    ground
}
