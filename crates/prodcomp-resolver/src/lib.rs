//! Package selection engine: RPM-style version range selectors, named package
//! set composition with memoized resolution, and the scanned artifact pool.

pub mod miss;
pub mod pkgset;
pub mod pool;
pub mod resolver;
pub mod selection;
pub mod selector;
