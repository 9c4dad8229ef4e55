//! Unit tests for the exploration tile grid.

use fogwalker::geo::{
    fog_tiles, tile_id_for, tiles_in_bounds, Coordinate, GeoBounds, GridError, TileId,
    LAT_TILE_SIZE_DEGREES,
};
use std::collections::HashSet;

const S: f64 = LAT_TILE_SIZE_DEGREES;

#[test]
fn test_tile_lookup_is_deterministic() {
    let coords = [
        Coordinate::new(40.7128, -74.006),
        Coordinate::new(-33.8688, 151.2093),
        Coordinate::new(89.9, 0.0),
        Coordinate::new(0.0, 0.0),
    ];
    for coord in &coords {
        assert_eq!(tile_id_for(coord, S), tile_id_for(coord, S));
    }
}

#[test]
fn test_millidegree_apart_gives_distinct_tiles() {
    let a = tile_id_for(&Coordinate::new(40.0, -74.0), S);
    let b = tile_id_for(&Coordinate::new(40.001, -74.0), S);
    assert_ne!(a, b);
    assert!(b.y > a.y);
}

#[test]
fn test_points_in_one_cell_share_an_id() {
    let id = tile_id_for(&Coordinate::new(48.8566, 2.3522), S);
    let cell = id.bounds(S);
    let width = cell.max_lng - cell.min_lng;
    let height = cell.max_lat - cell.min_lat;

    for (fy, fx) in [(0.1, 0.1), (0.5, 0.5), (0.9, 0.2), (0.3, 0.9)] {
        let inside = Coordinate::new(cell.min_lat + fy * height, cell.min_lng + fx * width);
        assert!(cell.contains(&inside));
        assert_eq!(tile_id_for(&inside, S), id);
    }
}

#[test]
fn test_negative_coordinates_floor_toward_south_west() {
    let id = tile_id_for(&Coordinate::new(-0.0001, -0.0001), S);
    assert_eq!(id, TileId::new(-1, -1));
}

#[test]
fn test_tile_id_string_form() {
    let id: TileId = "12,-7".parse().unwrap();
    assert_eq!(id, TileId::new(12, -7));
    assert_eq!(String::from(id), "12,-7");
    assert!(matches!("12;7".parse::<TileId>(), Err(GridError::InvalidTileId(_))));
    assert!("a,b".parse::<TileId>().is_err());
}

#[test]
fn test_viewport_enumeration_and_fog() {
    let bounds = GeoBounds::from_corners(
        Coordinate::new(51.5000, -0.1300),
        Coordinate::new(51.5030, -0.1250),
    );
    let all = tiles_in_bounds(&bounds, S, 10_000).unwrap();
    assert!(!all.is_empty());

    let visited: HashSet<TileId> = all.iter().take(3).copied().collect();
    let fog = fog_tiles(&bounds, &visited, S, 10_000).unwrap();
    assert_eq!(fog.len(), all.len() - 3);
    assert!(fog.iter().all(|id| !visited.contains(id)));

    assert!(matches!(
        tiles_in_bounds(&bounds, S, 2),
        Err(GridError::TooManyTiles { max: 2 })
    ));
}
