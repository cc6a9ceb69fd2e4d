//! Flakiness detection across repeated samples of the same page.
//!
//! Elements are tracked with a rolling identity: the first sample seeds one
//! track per element, and each later sample is matched against every track's
//! latest observation. Elements of a later sample that match no track start
//! new tracks, absent from all earlier samples.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{LvrError, Result};
use crate::matching::matcher::greedy_pairs;
use crate::matching::similarity::{node_similarity, MatcherConfig, NodeFeatures};
use crate::types::{
    FlakinessAnalysis, FlakinessType, FlakyElement, PropertyVariation, Snapshot, ValueCount,
    VisualNode,
};

/// Fewest samples that can reveal instability.
pub const MIN_SAMPLES: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlakinessOptions {
    /// x or y must range over more than this many pixels to be flaky.
    pub position_threshold: f64,
    /// width or height must range over more than this many pixels to be flaky.
    pub size_threshold: f64,
    /// Whether class and computed-style variation count as style flakiness.
    pub track_style: bool,
    #[serde(skip)]
    pub matcher: MatcherConfig,
}

impl Default for FlakinessOptions {
    fn default() -> Self {
        Self {
            position_threshold: 5.0,
            size_threshold: 5.0,
            track_style: true,
            matcher: MatcherConfig::default(),
        }
    }
}

impl FlakinessOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.position_threshold.is_finite() || self.position_threshold < 0.0 {
            return Err(LvrError::config("flakiness positionThreshold must be non-negative"));
        }
        if !self.size_threshold.is_finite() || self.size_threshold < 0.0 {
            return Err(LvrError::config("flakiness sizeThreshold must be non-negative"));
        }
        self.matcher.validate()
    }
}

/// One element followed across every sample.
#[derive(Debug, Clone)]
pub struct TrackedElement<'a> {
    pub identifier: String,
    /// One slot per sample; `None` where the element was not observed.
    pub observations: Vec<Option<&'a VisualNode>>,
}

impl<'a> TrackedElement<'a> {
    pub fn present(&self) -> impl Iterator<Item = &'a VisualNode> + '_ {
        self.observations.iter().flatten().copied()
    }

    pub fn first(&self) -> Option<&'a VisualNode> {
        self.present().next()
    }

    pub fn occurrence_rate(&self) -> f64 {
        if self.observations.is_empty() {
            return 0.0;
        }
        self.present().count() as f64 / self.observations.len() as f64
    }

    pub fn is_always_present(&self) -> bool {
        self.observations.iter().all(Option::is_some)
    }

    /// Max minus min of a rect field over the samples where the element exists.
    pub fn range(&self, field: RectField) -> f64 {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for node in self.present() {
            let v = field.get(node);
            min = min.min(v);
            max = max.max(v);
        }
        if min.is_finite() {
            max - min
        } else {
            0.0
        }
    }

    /// Distinct trimmed text values, in first-seen order.
    pub fn distinct_texts(&self) -> Vec<Option<&'a str>> {
        let mut out: Vec<Option<&'a str>> = Vec::new();
        for node in self.present() {
            let text = node.trimmed_text();
            if !out.contains(&text) {
                out.push(text);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectField {
    X,
    Y,
    Width,
    Height,
}

impl RectField {
    pub const ALL: [RectField; 4] = [RectField::X, RectField::Y, RectField::Width, RectField::Height];

    pub fn name(&self) -> &'static str {
        match self {
            RectField::X => "x",
            RectField::Y => "y",
            RectField::Width => "width",
            RectField::Height => "height",
        }
    }

    pub fn get(&self, node: &VisualNode) -> f64 {
        match self {
            RectField::X => node.rect.x,
            RectField::Y => node.rect.y,
            RectField::Width => node.rect.width,
            RectField::Height => node.rect.height,
        }
    }

    fn is_position(&self) -> bool {
        matches!(self, RectField::X | RectField::Y)
    }
}

/// `tag.class1.class2[role]`; DOM ids are left out because they are often generated.
pub fn fingerprint(node: &VisualNode) -> String {
    let mut out = node.tag();
    for class in node.classes() {
        out.push('.');
        out.push_str(class);
    }
    if let Some(role) = node.role_lower() {
        out.push('[');
        out.push_str(&role);
        out.push(']');
    }
    out
}

pub fn ensure_samples(samples: &[Snapshot]) -> Result<()> {
    if samples.len() < MIN_SAMPLES {
        return Err(LvrError::InsufficientSamples {
            required: MIN_SAMPLES,
            actual: samples.len(),
        });
    }
    Ok(())
}

/// Follow every element across all samples.
pub fn track_elements<'a>(samples: &'a [Snapshot], matcher: &MatcherConfig) -> Vec<TrackedElement<'a>> {
    let total = samples.len();
    let mut tracks: Vec<Vec<Option<&'a VisualNode>>> = Vec::new();
    let mut latest: Vec<&'a VisualNode> = Vec::new();

    for (k, sample) in samples.iter().enumerate() {
        let flat = sample.flatten();
        let candidates: Vec<NodeFeatures<'a>> = latest.iter().map(|n| NodeFeatures::new(*n)).collect();
        let incoming: Vec<NodeFeatures<'a>> = flat.iter().map(|e| NodeFeatures::new(e.node)).collect();

        let pairing = greedy_pairs(
            candidates.len(),
            incoming.len(),
            matcher.acceptance_floor,
            |t, j| node_similarity(&candidates[t], &incoming[j], matcher),
        );
        for &(t, j, _) in &pairing.pairs {
            tracks[t][k] = Some(flat[j].node);
            latest[t] = flat[j].node;
        }
        for &j in &pairing.unmatched_current {
            let mut observations = vec![None; total];
            observations[k] = Some(flat[j].node);
            tracks.push(observations);
            latest.push(flat[j].node);
        }
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    tracks
        .into_iter()
        .zip(latest)
        .map(|(observations, last)| {
            let base = observations
                .iter()
                .flatten()
                .next()
                .map_or_else(|| fingerprint(last), |n| fingerprint(*n));
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            let identifier = if *count == 1 {
                base
            } else {
                format!("{base}#{count}")
            };
            TrackedElement {
                identifier,
                observations,
            }
        })
        .collect()
}

/// Which kinds of instability a tracked element shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Instability {
    pub existence: bool,
    pub position: bool,
    pub size: bool,
    pub content: bool,
    pub style: bool,
}

impl Instability {
    pub fn of(track: &TrackedElement<'_>, options: &FlakinessOptions) -> Self {
        let position = RectField::ALL
            .iter()
            .filter(|f| f.is_position())
            .any(|f| track.range(*f) > options.position_threshold);
        let size = RectField::ALL
            .iter()
            .filter(|f| !f.is_position())
            .any(|f| track.range(*f) > options.size_threshold);
        let style = options.track_style
            && (distinct_count(track.present().map(class_key)) > 1
                || distinct_count(track.present().map(style_key)) > 1);
        Self {
            existence: !track.is_always_present(),
            position,
            size,
            content: track.distinct_texts().len() > 1,
            style,
        }
    }

    pub fn is_flaky(&self) -> bool {
        self.existence || self.position || self.size || self.content || self.style
    }

    /// Existence outranks everything; a single varying category names the
    /// type; several make it mixed.
    pub fn flakiness_type(&self) -> Option<FlakinessType> {
        if self.existence {
            return Some(FlakinessType::Existence);
        }
        let kinds: Vec<FlakinessType> = [
            (self.content, FlakinessType::Content),
            (self.style, FlakinessType::Style),
            (self.position, FlakinessType::Position),
            (self.size, FlakinessType::Size),
        ]
        .into_iter()
        .filter_map(|(flag, kind)| flag.then_some(kind))
        .collect();
        match kinds.as_slice() {
            [] => None,
            [single] => Some(*single),
            _ => Some(FlakinessType::Mixed),
        }
    }
}

fn class_key(node: &VisualNode) -> String {
    node.classes().collect::<Vec<_>>().join(" ")
}

fn style_key(node: &VisualNode) -> String {
    node.style.as_ref().map(|s| s.fingerprint()).unwrap_or_default()
}

fn distinct_count<T: PartialEq>(values: impl Iterator<Item = T>) -> usize {
    let mut seen: Vec<T> = Vec::new();
    for v in values {
        if !seen.contains(&v) {
            seen.push(v);
        }
    }
    seen.len()
}

/// Analyse N >= 2 samples of the same page for instability.
pub fn detect_flakiness(samples: &[Snapshot], options: &FlakinessOptions) -> Result<FlakinessAnalysis> {
    ensure_samples(samples)?;
    let tracks = track_elements(samples, &options.matcher);
    Ok(analyze_tracks(&tracks, samples.len(), options))
}

pub fn analyze_tracks(
    tracks: &[TrackedElement<'_>],
    total_samples: usize,
    options: &FlakinessOptions,
) -> FlakinessAnalysis {
    let mut flaky_elements = Vec::new();
    let mut by_type: BTreeMap<FlakinessType, usize> = BTreeMap::new();

    for track in tracks {
        let instability = Instability::of(track, options);
        let (Some(flakiness_type), Some(first)) = (instability.flakiness_type(), track.first())
        else {
            continue;
        };
        *by_type.entry(flakiness_type).or_default() += 1;
        flaky_elements.push(FlakyElement {
            identifier: track.identifier.clone(),
            tag_name: first.tag_name.clone(),
            class_name: first.class_name.clone(),
            flakiness_type,
            occurrence_rate: track.occurrence_rate(),
            variations: variations(track, &instability),
        });
    }

    let total_elements = tracks.len();
    let unstable_count = flaky_elements.len();
    let overall_score = if total_elements == 0 {
        0.0
    } else {
        100.0 * unstable_count as f64 / total_elements as f64
    };
    let recommendations = recommendations(&flaky_elements);

    debug!(
        samples = total_samples,
        tracked = total_elements,
        unstable = unstable_count,
        overall_score,
        "analysed flakiness"
    );

    FlakinessAnalysis {
        overall_score,
        total_samples,
        total_elements,
        stable_count: total_elements - unstable_count,
        unstable_count,
        flaky_elements,
        by_type,
        recommendations,
    }
}

fn variations(track: &TrackedElement<'_>, instability: &Instability) -> Vec<PropertyVariation> {
    let mut out = Vec::new();
    if instability.existence {
        let values: Vec<Value> = track
            .observations
            .iter()
            .map(|o| Value::Bool(o.is_some()))
            .collect();
        out.push(categorical("existence", values));
    }
    for field in RectField::ALL {
        if track.range(field) > 0.0 {
            let values: Vec<f64> = track.present().map(|n| field.get(n)).collect();
            out.push(numeric(field.name(), &values));
        }
    }
    if instability.content {
        let values = track
            .present()
            .map(|n| Value::from(n.trimmed_text()))
            .collect();
        out.push(categorical("text", values));
    }
    if instability.style {
        let classes: Vec<Value> = track.present().map(|n| Value::from(class_key(n))).collect();
        if distinct_count(classes.iter()) > 1 {
            out.push(categorical("className", classes));
        }
        let styles: Vec<Value> = track.present().map(|n| Value::from(style_key(n))).collect();
        if distinct_count(styles.iter()) > 1 {
            out.push(categorical("style", styles));
        }
    }
    out
}

/// Histogram ordered by count, descending, then first appearance.
fn histogram(values: &[Value]) -> Vec<ValueCount> {
    let mut buckets: Vec<(Value, usize)> = Vec::new();
    for v in values {
        match buckets.iter_mut().find(|(seen, _)| seen == v) {
            Some((_, count)) => *count += 1,
            None => buckets.push((v.clone(), 1)),
        }
    }
    buckets.sort_by(|a, b| b.1.cmp(&a.1));
    let total = values.len().max(1) as f64;
    buckets
        .into_iter()
        .map(|(value, count)| ValueCount {
            value,
            count,
            percentage: 100.0 * count as f64 / total,
        })
        .collect()
}

fn numeric(property: &str, values: &[f64]) -> PropertyVariation {
    let n = values.len().max(1) as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let json: Vec<Value> = values.iter().map(|v| Value::from(*v)).collect();
    PropertyVariation {
        property: property.to_string(),
        values: histogram(&json),
        variance,
        range: if min.is_finite() { max - min } else { 0.0 },
    }
}

/// For text-like properties `variance` is the share of samples that differ
/// from the most common value.
fn categorical(property: &str, values: Vec<Value>) -> PropertyVariation {
    let values = histogram(&values);
    let total: usize = values.iter().map(|v| v.count).sum();
    let modal = values.first().map(|v| v.count).unwrap_or(0);
    let variance = if total == 0 {
        0.0
    } else {
        (total - modal) as f64 / total as f64
    };
    PropertyVariation {
        property: property.to_string(),
        values,
        variance,
        range: 0.0,
    }
}

fn recommendations(flaky: &[FlakyElement]) -> Vec<String> {
    let mut out = Vec::new();
    let of_type = |t: FlakinessType| flaky.iter().filter(move |e| e.flakiness_type == t);
    let max_range = |props: &[&str]| {
        flaky
            .iter()
            .flat_map(|e| e.variations.iter())
            .filter(|v| props.contains(&v.property.as_str()))
            .map(|v| v.range)
            .fold(0.0, f64::max)
    };

    let shifting = of_type(FlakinessType::Position).count();
    if shifting > 0 {
        out.push(format!(
            "{shifting} element(s) shift position between samples; use a position tolerance of at least {:.0}px.",
            max_range(&["x", "y"]).ceil()
        ));
    }
    let resizing = of_type(FlakinessType::Size).count();
    if resizing > 0 {
        out.push(format!(
            "{resizing} element(s) change size between samples; use a size tolerance of at least {:.0}px.",
            max_range(&["width", "height"]).ceil()
        ));
    }
    let content: Vec<&str> = of_type(FlakinessType::Content)
        .map(|e| e.identifier.as_str())
        .collect();
    if !content.is_empty() {
        out.push(format!(
            "Dynamic text in {}; ignore these elements or compare text in similarity mode.",
            content.join(", ")
        ));
    }
    let existence: Vec<&str> = of_type(FlakinessType::Existence)
        .map(|e| e.identifier.as_str())
        .collect();
    if !existence.is_empty() {
        out.push(format!(
            "{} appear(s) only in some samples; wait for the page to settle or add ignore selectors.",
            existence.join(", ")
        ));
    }
    if of_type(FlakinessType::Style).next().is_some() {
        out.push(
            "Class or style changes between samples suggest running animations or hover state; disable animations before capture."
                .to_string(),
        );
    }
    if of_type(FlakinessType::Mixed).next().is_some() {
        out.push(
            "Some elements vary in several ways at once; review them before trusting comparisons that include them."
                .to_string(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rect;
    use crate::viewport::Viewport;

    fn page(banner_y: f64, clock: &str) -> Snapshot {
        Snapshot::new(
            "https://example.com",
            Viewport::default(),
            vec![
                VisualNode::new("header", Rect::new(0.0, 0.0, 1280.0, 60.0)).with_class("site-header"),
                VisualNode::new("div", Rect::new(0.0, banner_y, 1280.0, 90.0)).with_class("banner"),
                VisualNode::new("span", Rect::new(1100.0, 20.0, 80.0, 20.0))
                    .with_class("clock")
                    .with_text(clock),
            ],
        )
    }

    #[test]
    fn requires_two_samples() {
        let err = detect_flakiness(&[page(100.0, "10:00")], &FlakinessOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            LvrError::InsufficientSamples {
                required: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn identical_samples_have_no_flakiness() {
        let s = page(100.0, "10:00");
        let analysis =
            detect_flakiness(&[s.clone(), s.clone(), s], &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.overall_score, 0.0);
        assert!(analysis.flaky_elements.is_empty());
        assert!(analysis.recommendations.is_empty());
        assert_eq!(analysis.stable_count, 3);
    }

    #[test]
    fn position_jitter_is_classified() {
        let samples = [page(100.0, "10:00"), page(110.0, "10:00"), page(105.0, "10:00")];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.flaky_elements.len(), 1);
        let banner = &analysis.flaky_elements[0];
        assert_eq!(banner.identifier, "div.banner");
        assert_eq!(banner.flakiness_type, FlakinessType::Position);
        assert_eq!(banner.occurrence_rate, 1.0);
        let y = banner.variations.iter().find(|v| v.property == "y").unwrap();
        assert_eq!(y.range, 10.0);
        assert_eq!(y.values.len(), 3);
        assert!((analysis.overall_score - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn jitter_within_threshold_is_stable() {
        let samples = [page(100.0, "10:00"), page(104.0, "10:00")];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert!(analysis.flaky_elements.is_empty());
    }

    #[test]
    fn changing_text_is_content() {
        let samples = [page(100.0, "10:00"), page(100.0, "10:01"), page(100.0, "10:00")];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.flaky_elements.len(), 1);
        let clock = &analysis.flaky_elements[0];
        assert_eq!(clock.flakiness_type, FlakinessType::Content);
        let text = &clock.variations[0];
        assert_eq!(text.property, "text");
        assert_eq!(text.values[0].value, "10:00");
        assert_eq!(text.values[0].count, 2);
        assert!((text.variance - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(analysis.by_type.get(&FlakinessType::Content), Some(&1));
    }

    #[test]
    fn missing_elements_are_existence() {
        let mut without_banner = page(100.0, "10:00");
        without_banner.elements.remove(1);
        let samples = [page(100.0, "10:00"), without_banner, page(100.0, "10:00")];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.flaky_elements.len(), 1);
        let banner = &analysis.flaky_elements[0];
        assert_eq!(banner.flakiness_type, FlakinessType::Existence);
        assert!((banner.occurrence_rate - 2.0 / 3.0).abs() < 1e-9);
        // the element is tracked through the gap rather than duplicated
        assert_eq!(analysis.total_elements, 3);
    }

    #[test]
    fn late_arrivals_start_new_tracks() {
        let mut with_toast = page(100.0, "10:00");
        with_toast
            .elements
            .push(VisualNode::new("div", Rect::new(500.0, 600.0, 300.0, 50.0)).with_class("toast"));
        let samples = [page(100.0, "10:00"), with_toast];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.total_elements, 4);
        let toast = &analysis.flaky_elements[0];
        assert_eq!(toast.identifier, "div.toast");
        assert_eq!(toast.flakiness_type, FlakinessType::Existence);
        assert_eq!(toast.occurrence_rate, 0.5);
    }

    #[test]
    fn several_kinds_make_mixed() {
        let mut moved_and_changed = page(120.0, "10:00");
        moved_and_changed.elements[1].text = Some("Sale ends soon".to_string());
        let samples = [page(100.0, "10:00"), moved_and_changed];
        let analysis = detect_flakiness(&samples, &FlakinessOptions::default()).unwrap();
        assert_eq!(analysis.flaky_elements[0].flakiness_type, FlakinessType::Mixed);
    }

    #[test]
    fn duplicate_fingerprints_get_suffixes() {
        let item = |x: f64| VisualNode::new("li", Rect::new(x, 0.0, 50.0, 20.0)).with_class("tab");
        let s = Snapshot::new("u", Viewport::default(), vec![item(0.0), item(300.0), item(600.0)]);
        let tracks = track_elements(std::slice::from_ref(&s), &MatcherConfig::default());
        let ids: Vec<&str> = tracks.iter().map(|t| t.identifier.as_str()).collect();
        assert_eq!(ids, vec!["li.tab", "li.tab#2", "li.tab#3"]);
    }

    #[test]
    fn fingerprint_includes_role_not_id() {
        let node = VisualNode::new("DIV", Rect::default())
            .with_id("react-123")
            .with_class("a b")
            .with_role("Dialog");
        assert_eq!(fingerprint(&node), "div.a.b[dialog]");
    }
}
