//! Broad-phase proxy storage and pair finding.
//!
//! The world only talks to the broad phase through [`BroadPhase`], so a
//! tree or grid can replace the brute-force default without touching the
//! solver. Proxies store a fattened AABB; small motions inside the fat box
//! do not generate new pair searches.

use glam::Vec2;

use crate::math::cross_sv;
use crate::settings::{AABB_EXTENSION, AABB_MULTIPLIER};

use super::aabb::{Aabb, RayCastInput};

/// Index of a broad-phase proxy.
pub type ProxyId = usize;

/// Spatial index over fattened AABBs.
pub trait BroadPhase<T: Copy> {
    /// Insert a proxy. The stored AABB is `aabb` grown by `AABB_EXTENSION`.
    fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId;

    fn destroy_proxy(&mut self, proxy: ProxyId);

    /// Update a proxy after its shape moved by `displacement`.
    ///
    /// Returns `true` when the fat AABB had to be rebuilt, in which case the
    /// proxy takes part in the next [`BroadPhase::update_pairs`].
    fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec2) -> bool;

    /// Force a proxy into the next pair update without moving it.
    fn touch_proxy(&mut self, proxy: ProxyId);

    fn fat_aabb(&self, proxy: ProxyId) -> Aabb;

    fn user_data(&self, proxy: ProxyId) -> T;

    /// Whether the fat AABBs of two proxies overlap.
    fn test_overlap(&self, proxy_a: ProxyId, proxy_b: ProxyId) -> bool;

    /// Report every proxy whose fat AABB overlaps `aabb`. Returning `false`
    /// from the callback stops the query.
    fn query(&self, aabb: &Aabb, callback: &mut dyn FnMut(ProxyId) -> bool);

    /// Report proxies whose fat AABB the segment crosses.
    ///
    /// The callback returns the new max fraction: `0` stops the cast, a
    /// negative value ignores the proxy, a positive value clips the ray.
    fn ray_cast(
        &self,
        input: &RayCastInput,
        callback: &mut dyn FnMut(&RayCastInput, ProxyId) -> f32,
    );

    /// Report each new overlapping pair involving a moved proxy once, then
    /// clear the move buffer.
    fn update_pairs(&mut self, callback: &mut dyn FnMut(T, T));

    fn proxy_count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Proxy<T> {
    aabb: Aabb,
    user_data: T,
}

/// O(n) query, O(n * moved) pair update. Enough for small scenes and a
/// reference for other implementations.
#[derive(Debug, Clone)]
pub struct BruteForceBroadPhase<T> {
    proxies: Vec<Option<Proxy<T>>>,
    free_list: Vec<ProxyId>,
    move_buffer: Vec<ProxyId>,
    proxy_count: usize,
}

impl<T> Default for BruteForceBroadPhase<T> {
    fn default() -> Self {
        Self {
            proxies: Vec::new(),
            free_list: Vec::new(),
            move_buffer: Vec::new(),
            proxy_count: 0,
        }
    }
}

impl<T: Copy> BruteForceBroadPhase<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn proxy(&self, proxy: ProxyId) -> &Proxy<T> {
        match self.proxies.get(proxy) {
            Some(Some(p)) => p,
            _ => panic!("invalid broad-phase proxy {proxy}"),
        }
    }

    fn buffer_move(&mut self, proxy: ProxyId) {
        if !self.move_buffer.contains(&proxy) {
            self.move_buffer.push(proxy);
        }
    }

    fn live(&self) -> impl Iterator<Item = (ProxyId, &Proxy<T>)> {
        self.proxies
            .iter()
            .enumerate()
            .filter_map(|(id, p)| p.as_ref().map(|p| (id, p)))
    }
}

impl<T: Copy> BroadPhase<T> for BruteForceBroadPhase<T> {
    fn create_proxy(&mut self, aabb: Aabb, user_data: T) -> ProxyId {
        let proxy = Proxy {
            aabb: aabb.fattened(AABB_EXTENSION),
            user_data,
        };
        let id = match self.free_list.pop() {
            Some(id) => {
                self.proxies[id] = Some(proxy);
                id
            }
            None => {
                self.proxies.push(Some(proxy));
                self.proxies.len() - 1
            }
        };
        self.proxy_count += 1;
        self.buffer_move(id);
        id
    }

    fn destroy_proxy(&mut self, proxy: ProxyId) {
        assert!(
            matches!(self.proxies.get(proxy), Some(Some(_))),
            "invalid broad-phase proxy {proxy}"
        );
        self.proxies[proxy] = None;
        self.free_list.push(proxy);
        self.move_buffer.retain(|id| *id != proxy);
        self.proxy_count -= 1;
    }

    fn move_proxy(&mut self, proxy: ProxyId, aabb: Aabb, displacement: Vec2) -> bool {
        if self.proxy(proxy).aabb.contains(&aabb) {
            return false;
        }

        // Extend the fat box in the direction of motion.
        let mut fat = aabb.fattened(AABB_EXTENSION);
        let d = AABB_MULTIPLIER * displacement;
        if d.x < 0.0 {
            fat.lower.x += d.x;
        } else {
            fat.upper.x += d.x;
        }
        if d.y < 0.0 {
            fat.lower.y += d.y;
        } else {
            fat.upper.y += d.y;
        }

        if let Some(Some(p)) = self.proxies.get_mut(proxy) {
            p.aabb = fat;
        }
        self.buffer_move(proxy);
        true
    }

    fn touch_proxy(&mut self, proxy: ProxyId) {
        self.buffer_move(proxy);
    }

    fn fat_aabb(&self, proxy: ProxyId) -> Aabb {
        self.proxy(proxy).aabb
    }

    fn user_data(&self, proxy: ProxyId) -> T {
        self.proxy(proxy).user_data
    }

    fn test_overlap(&self, proxy_a: ProxyId, proxy_b: ProxyId) -> bool {
        self.proxy(proxy_a).aabb.overlaps(&self.proxy(proxy_b).aabb)
    }

    fn query(&self, aabb: &Aabb, callback: &mut dyn FnMut(ProxyId) -> bool) {
        for (id, p) in self.live() {
            if p.aabb.overlaps(aabb) && !callback(id) {
                return;
            }
        }
    }

    fn ray_cast(
        &self,
        input: &RayCastInput,
        callback: &mut dyn FnMut(&RayCastInput, ProxyId) -> f32,
    ) {
        let p1 = input.p1;
        let p2 = input.p2;
        let r = (p2 - p1).normalize_or_zero();
        if r == Vec2::ZERO {
            return;
        }

        // Separating axis for the segment: |dot(v, p1 - c)| > dot(|v|, h)
        let v = cross_sv(1.0, r);
        let abs_v = v.abs();

        let mut max_fraction = input.max_fraction;
        let segment_aabb = |fraction: f32| {
            let t = p1 + fraction * (p2 - p1);
            Aabb::new(p1.min(t), p1.max(t))
        };
        let mut bounds = segment_aabb(max_fraction);

        for (id, p) in self.live() {
            if !p.aabb.overlaps(&bounds) {
                continue;
            }
            let separation = v.dot(p1 - p.aabb.center()).abs() - abs_v.dot(p.aabb.extents());
            if separation > 0.0 {
                continue;
            }

            let sub_input = RayCastInput {
                p1,
                p2,
                max_fraction,
            };
            let value = callback(&sub_input, id);
            if value == 0.0 {
                return;
            }
            if value > 0.0 {
                max_fraction = value;
                bounds = segment_aabb(max_fraction);
            }
        }
    }

    fn update_pairs(&mut self, callback: &mut dyn FnMut(T, T)) {
        let mut pairs: Vec<(ProxyId, ProxyId)> = Vec::new();

        for &query_id in &self.move_buffer {
            let Some(Some(query_proxy)) = self.proxies.get(query_id) else {
                continue;
            };
            for (id, p) in self.live() {
                if id == query_id {
                    continue;
                }
                // Both moved: the lower id reports the pair.
                if id < query_id && self.move_buffer.contains(&id) {
                    continue;
                }
                if p.aabb.overlaps(&query_proxy.aabb) {
                    pairs.push((id.min(query_id), id.max(query_id)));
                }
            }
        }

        pairs.sort_unstable();
        pairs.dedup();
        for (a, b) in pairs {
            callback(self.user_data(a), self.user_data(b));
        }

        self.move_buffer.clear();
    }

    fn proxy_count(&self) -> usize {
        self.proxy_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: Vec2) -> Aabb {
        Aabb::new(center - Vec2::splat(0.5), center + Vec2::splat(0.5))
    }

    fn collect_pairs(bp: &mut BruteForceBroadPhase<u32>) -> Vec<(u32, u32)> {
        let mut pairs = Vec::new();
        bp.update_pairs(&mut |a, b| pairs.push((a.min(b), a.max(b))));
        pairs.sort_unstable();
        pairs
    }

    #[test]
    fn test_broadphase_overlapping() {
        let mut bp = BruteForceBroadPhase::new();
        bp.create_proxy(unit_box(Vec2::ZERO), 1u32);
        bp.create_proxy(unit_box(Vec2::new(0.8, 0.0)), 2u32);

        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);
        // Move buffer is cleared after an update.
        assert!(collect_pairs(&mut bp).is_empty());
    }

    #[test]
    fn test_broadphase_no_overlap() {
        let mut bp = BruteForceBroadPhase::new();
        bp.create_proxy(unit_box(Vec2::ZERO), 1u32);
        bp.create_proxy(unit_box(Vec2::new(10.0, 0.0)), 2u32);
        assert!(collect_pairs(&mut bp).is_empty());
    }

    #[test]
    fn test_broadphase_small_move_stays_in_fat_aabb() {
        let mut bp = BruteForceBroadPhase::new();
        let id = bp.create_proxy(unit_box(Vec2::ZERO), 7u32);
        let _ = collect_pairs(&mut bp);

        let nudged = unit_box(Vec2::new(0.5 * AABB_EXTENSION, 0.0));
        assert!(!bp.move_proxy(id, nudged, Vec2::new(0.05, 0.0)));

        let far = unit_box(Vec2::new(3.0, 0.0));
        assert!(bp.move_proxy(id, far, Vec2::new(3.0, 0.0)));
        let fat = bp.fat_aabb(id);
        assert!(fat.contains(&far));
        // Predictive extension in the direction of travel.
        assert!(fat.upper.x > far.upper.x + AABB_EXTENSION);
    }

    #[test]
    fn test_broadphase_moved_proxy_finds_new_partner() {
        let mut bp = BruteForceBroadPhase::new();
        let a = bp.create_proxy(unit_box(Vec2::ZERO), 1u32);
        bp.create_proxy(unit_box(Vec2::new(5.0, 0.0)), 2u32);
        assert!(collect_pairs(&mut bp).is_empty());

        bp.move_proxy(a, unit_box(Vec2::new(4.5, 0.0)), Vec2::new(4.5, 0.0));
        assert_eq!(collect_pairs(&mut bp), vec![(1, 2)]);
        assert!(bp.test_overlap(0, 1));
    }

    #[test]
    fn test_broadphase_destroy_reuses_slot() {
        let mut bp = BruteForceBroadPhase::new();
        let a = bp.create_proxy(unit_box(Vec2::ZERO), 1u32);
        let _b = bp.create_proxy(unit_box(Vec2::ZERO), 2u32);
        bp.destroy_proxy(a);
        assert_eq!(bp.proxy_count(), 1);
        assert!(collect_pairs(&mut bp).is_empty());

        let c = bp.create_proxy(unit_box(Vec2::ZERO), 3u32);
        assert_eq!(c, a);
        assert_eq!(bp.user_data(c), 3);
        assert_eq!(collect_pairs(&mut bp), vec![(2, 3)]);
    }

    #[test]
    fn test_broadphase_query_stops_early() {
        let mut bp = BruteForceBroadPhase::new();
        for i in 0..4u32 {
            bp.create_proxy(unit_box(Vec2::new(i as f32 * 0.1, 0.0)), i);
        }
        let mut seen = 0;
        bp.query(&unit_box(Vec2::ZERO), &mut |_| {
            seen += 1;
            seen < 2
        });
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_broadphase_ray_cast_clips() {
        let mut bp = BruteForceBroadPhase::new();
        bp.create_proxy(unit_box(Vec2::new(2.0, 0.0)), 1u32);
        bp.create_proxy(unit_box(Vec2::new(6.0, 0.0)), 2u32);
        bp.create_proxy(unit_box(Vec2::new(2.0, 5.0)), 3u32);

        let input = RayCastInput {
            p1: Vec2::ZERO,
            p2: Vec2::new(10.0, 0.0),
            max_fraction: 1.0,
        };
        let mut hits = Vec::new();
        bp.ray_cast(&input, &mut |sub, id| {
            hits.push(bp.user_data(id));
            // Pretend every proxy is hit at its near face.
            let near = (bp.fat_aabb(id).lower.x - sub.p1.x) / 10.0;
            near.min(sub.max_fraction)
        });
        assert!(hits.contains(&1));
        assert!(!hits.contains(&3), "off-axis proxy should be skipped");
    }
}
