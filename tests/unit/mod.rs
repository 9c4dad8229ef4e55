//! Unit test modules.

mod geo_test;
mod gpx_test;
mod tile_grid_test;
