//! Stateless geometry used by every tracker: pixel-space distances and
//! joint angles, plus great-circle math for GPS fixes.

#[allow(unused_imports)]
use micromath::F32Ext;
use nalgebra::Vector2;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Euclidean distance between two image-space points, px.
pub fn pixel_distance(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    (a - b).magnitude()
}

/// Interior angle at `vertex` formed by `a` and `b`, in degrees [0, 180].
///
/// Degenerate inputs (a limb point collapsed onto the vertex) read as 0
/// rather than NaN.
pub fn angle_at_vertex_deg(a: Vector2<f32>, vertex: Vector2<f32>, b: Vector2<f32>) -> f32 {
    let u = a - vertex;
    let v = b - vertex;
    let denom = u.magnitude() * v.magnitude();
    if denom < 1e-6 {
        return 0.0;
    }
    let cos = (u.dot(&v) / denom).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Absolute angular difference between two headings, folded into [0, 180].
pub fn heading_diff_deg(a: f32, b: f32) -> f32 {
    let mut d = (b - a) % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d.abs()
}

/// Great-circle distance between two (lat, lon) coordinates, m.
pub fn haversine_m(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1 = from.0.to_radians();
    let lat2 = to.0.to_radians();
    let dlat = (to.0 - from.0).to_radians();
    let dlon = (to.1 - from.1).to_radians();

    let a = libm::sin(dlat / 2.0) * libm::sin(dlat / 2.0)
        + libm::cos(lat1) * libm::cos(lat2) * libm::sin(dlon / 2.0) * libm::sin(dlon / 2.0);
    let c = 2.0 * libm::atan2(libm::sqrt(a), libm::sqrt(1.0 - a));
    EARTH_RADIUS_M * c
}

/// Initial great-circle bearing from one coordinate to another, degrees
/// clockwise from true north in [0, 360).
pub fn bearing_deg(from: (f64, f64), to: (f64, f64)) -> f64 {
    let lat1 = from.0.to_radians();
    let lat2 = to.0.to_radians();
    let dlon = (to.1 - from.1).to_radians();

    let y = libm::sin(dlon) * libm::cos(lat2);
    let x = libm::cos(lat1) * libm::sin(lat2) - libm::sin(lat1) * libm::cos(lat2) * libm::cos(dlon);
    let bearing = libm::atan2(y, x).to_degrees();
    (bearing + 360.0) % 360.0
}

/// Local east/north displacement between two coordinates, m. Equirectangular
/// approximation, plenty for the tens of meters a shuttle run covers.
pub fn local_displacement_m(from: (f64, f64), to: (f64, f64)) -> (f64, f64) {
    let mean_lat = ((from.0 + to.0) / 2.0).to_radians();
    let east = (to.1 - from.1).to_radians() * libm::cos(mean_lat) * EARTH_RADIUS_M;
    let north = (to.0 - from.0).to_radians() * EARTH_RADIUS_M;
    (east, north)
}

/// Cosine between the displacement `prev -> mid` and `mid -> cur`.
///
/// Near -1 means the track reversed. `None` when either displacement is too
/// short to carry a direction (GPS jitter).
pub fn displacement_cosine(prev: (f64, f64), mid: (f64, f64), cur: (f64, f64)) -> Option<f64> {
    const MIN_DISPLACEMENT_M: f64 = 0.3;

    let (e1, n1) = local_displacement_m(prev, mid);
    let (e2, n2) = local_displacement_m(mid, cur);
    let m1 = libm::sqrt(e1 * e1 + n1 * n1);
    let m2 = libm::sqrt(e2 * e2 + n2 * n2);
    if m1 < MIN_DISPLACEMENT_M || m2 < MIN_DISPLACEMENT_M {
        return None;
    }
    Some((e1 * e2 + n1 * n2) / (m1 * m2))
}
