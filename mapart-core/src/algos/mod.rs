pub(crate) mod geometry;
pub(crate) mod layers;
mod map_drawer;
pub(crate) mod osm_filter;
pub(crate) mod styles;

pub use map_drawer::Figure;
pub(crate) use map_drawer::MapDrawer;

pub(crate) struct RngHandler;

impl RngHandler {
    #[cfg(not(test))]
    pub fn rng() -> impl rand::Rng {
        rand::rng()
    }

    #[cfg(test)]
    pub fn rng() -> impl rand::Rng {
        use crate::constants::TEST_RANDOM_INCREMENT;
        use crate::constants::TEST_RANDOM_INITIAL;
        use rand::rngs::mock::StepRng;

        StepRng::new(TEST_RANDOM_INITIAL, TEST_RANDOM_INCREMENT)
    }
}
