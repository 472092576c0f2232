//! Marquee animation for text banners.
//!
//! Each scrolling banner carries a signed offset that moves by `-speed`
//! pixels per tick along its axis. Once the text has fully left through the
//! leading edge (`offset <= -(content + container)`), the next tick puts it
//! back at `+container` so it re-enters from the trailing edge.
//!
//! Ticks run on their own fixed period (50 ms by default), independent of
//! the render loop. Static banners never tick and stay at offset 0.

use weever_layer_model::{LayerId, LayerModel, ScrollState, TextBanner};

use crate::text_metrics::{banner_extents, AxisExtents, TextMetrics};

/// Advance one marquee by a single tick. Returns `true` if it wrapped.
pub fn step(state: &mut ScrollState, speed: u32, extents: AxisExtents) -> bool {
    let lower_bound = -(extents.content + extents.container);
    if state.offset <= lower_bound {
        state.offset = extents.container;
        state.wraps += 1;
        true
    } else {
        state.offset -= f64::from(speed.max(1));
        false
    }
}

/// Summary of one animator pass over the model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollTick {
    /// Banners that advanced this tick.
    pub advanced: usize,
    /// Banners that wrapped this tick.
    pub wrapped: Vec<LayerId>,
}

/// Drives every scrolling text banner in a [`LayerModel`].
///
/// The animator owns no per-layer state: offsets live in the banners
/// themselves, so a removed layer simply stops being visited.
pub struct ScrollAnimator<M> {
    metrics: M,
}

impl<M: TextMetrics> ScrollAnimator<M> {
    pub fn new(metrics: M) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Run one tick across all banners.
    pub fn tick(&self, model: &mut LayerModel) -> ScrollTick {
        let mut summary = ScrollTick::default();
        for (id, box_size, banner) in model.text_banners_mut() {
            if !banner.scroll_direction.is_scrolling() {
                banner.scroll = ScrollState::default();
                continue;
            }
            let extents = banner_extents(banner, box_size, &self.metrics);
            let speed = banner.speed;
            if step(&mut banner.scroll, speed, extents) {
                tracing::trace!(layer_id = %id, wraps = banner.scroll.wraps, "Marquee wrapped");
                summary.wrapped.push(id);
            }
            summary.advanced += 1;
        }
        summary
    }

    /// Extents for one banner, measured the same way the tick does.
    pub fn extents(&self, banner: &TextBanner, box_size: weever_layer_model::Size) -> AxisExtents {
        banner_extents(banner, box_size, &self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weever_layer_model::{LayerKind, LayerPlacement, ScrollDirection};

    use crate::text_metrics::ApproxMetrics;

    #[test]
    fn step_moves_by_speed_then_wraps() {
        let extents = AxisExtents {
            content: 10.0,
            container: 20.0,
        };
        let mut state = ScrollState::default();
        for expected in [-5.0, -10.0, -15.0, -20.0, -25.0, -30.0] {
            assert!(!step(&mut state, 5, extents));
            assert_eq!(state.offset, expected);
        }
        // Exactly at the lower bound: next tick re-enters at the trailing edge.
        assert!(step(&mut state, 5, extents));
        assert_eq!(state.offset, 20.0);
        assert_eq!(state.wraps, 1);
    }

    #[test]
    fn overshoot_past_bound_still_wraps() {
        let extents = AxisExtents {
            content: 9.0,
            container: 9.0,
        };
        let mut state = ScrollState {
            offset: -15.0,
            wraps: 0,
        };
        assert!(!step(&mut state, 7, extents));
        assert_eq!(state.offset, -22.0);
        assert!(step(&mut state, 7, extents));
        assert_eq!(state.offset, 9.0);
    }

    #[test]
    fn static_banners_do_not_tick() {
        let mut model = LayerModel::new();
        model.add_layer(
            LayerKind::TextBanner(weever_layer_model::TextBanner::new("hold")),
            LayerPlacement::new(0.0, 0.0, 200.0, 50.0),
        );
        let animator = ScrollAnimator::new(ApproxMetrics);
        let summary = animator.tick(&mut model);
        assert_eq!(summary.advanced, 0);
        let layer = &model.list_layers()[0];
        assert_eq!(layer.text_banner().unwrap().scroll.offset, 0.0);
    }

    #[test]
    fn removed_banner_is_no_longer_ticked() {
        let mut model = LayerModel::new();
        let id = model.add_layer(
            LayerKind::TextBanner(
                weever_layer_model::TextBanner::new("bye")
                    .with_scroll(ScrollDirection::Horizontal, 3),
            ),
            LayerPlacement::new(0.0, 0.0, 300.0, 40.0),
        );
        let animator = ScrollAnimator::new(ApproxMetrics);
        assert_eq!(animator.tick(&mut model).advanced, 1);
        model.remove_layer(id);
        assert_eq!(animator.tick(&mut model), ScrollTick::default());
    }
}
