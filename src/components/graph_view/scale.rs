//! Linear scales for mapping data-space coordinates onto the canvas.

/// Minimum and maximum of the values, or `None` when there are none.
/// NaN values are skipped.
pub fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
	values
		.into_iter()
		.filter(|v| !v.is_nan())
		.fold(None, |acc, v| match acc {
			None => Some((v, v)),
			Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
		})
}

/// Maps a continuous domain onto a continuous range. The range may be
/// reversed (`range.0 > range.1`) to flip an axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
	pub domain: (f64, f64),
	pub range: (f64, f64),
}

impl LinearScale {
	pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
		Self { domain, range }
	}

	pub fn apply(&self, value: f64) -> f64 {
		let (d0, d1) = self.domain;
		let (r0, r1) = self.range;
		let span = d1 - d0;
		// Degenerate domains collapse onto the middle of the range.
		if span == 0.0 {
			return (r0 + r1) / 2.0;
		}
		r0 + (value - d0) / span * (r1 - r0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extent_ignores_nan() {
		assert_eq!(extent([3.0, f64::NAN, -1.0, 7.5]), Some((-1.0, 7.5)));
		assert_eq!(extent(Vec::<f64>::new()), None);
	}

	#[test]
	fn maps_domain_onto_range() {
		let s = LinearScale::new((0.0, 100.0), (50.0, 450.0));
		assert_eq!(s.apply(0.0), 50.0);
		assert_eq!(s.apply(100.0), 450.0);
		assert_eq!(s.apply(25.0), 150.0);
	}

	#[test]
	fn reversed_range_flips_axis() {
		let s = LinearScale::new((0.0, 100.0), (450.0, 50.0));
		assert_eq!(s.apply(100.0), 50.0);
		assert_eq!(s.apply(0.0), 450.0);
		assert_eq!(s.apply(50.0), 250.0);
	}

	#[test]
	fn degenerate_domain_centers_in_range() {
		let s = LinearScale::new((5.0, 5.0), (50.0, 450.0));
		assert_eq!(s.apply(5.0), 250.0);
	}
}
