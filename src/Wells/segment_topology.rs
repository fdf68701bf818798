use super::errors::WellError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One segment of a multisegment well. Segment numbers are 1-based as in the deck,
/// `outlet_segment == 0` marks the top segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub segment_number: usize,
    pub outlet_segment: usize,
    /// well-local perforation indices connected to this segment
    #[serde(default)]
    pub perforations: Vec<usize>,
}

impl Segment {
    pub fn new(segment_number: usize, outlet_segment: usize, perforations: Vec<usize>) -> Self {
        Self {
            segment_number,
            outlet_segment,
            perforations,
        }
    }
}

/// Validated segment tree of one well, indexed by position in the segment list.
#[derive(Debug, Clone, PartialEq)]
pub struct MultisegmentWellTopology {
    segments: Vec<Segment>,
    inlets: Vec<Vec<usize>>,
    number_to_index: HashMap<usize, usize>,
    num_perforations: usize,
}

impl MultisegmentWellTopology {
    /// The first segment must be the top segment (number 1, no outlet). Every other segment
    /// drains into an existing segment and every segment reaches the top.
    pub fn new(segments: Vec<Segment>) -> Result<Self, WellError> {
        let top = segments
            .first()
            .ok_or(WellError::Topology("a well needs at least one segment".to_string()))?;
        if top.segment_number != 1 || top.outlet_segment != 0 {
            return Err(WellError::Topology(format!(
                "first segment must be segment 1 without outlet, got segment {} with outlet {}",
                top.segment_number, top.outlet_segment
            )));
        }

        let mut number_to_index = HashMap::with_capacity(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            if segment.segment_number == 0 {
                return Err(WellError::Topology("segment numbers start at 1".to_string()));
            }
            if number_to_index.insert(segment.segment_number, idx).is_some() {
                return Err(WellError::Topology(format!(
                    "segment {} defined twice",
                    segment.segment_number
                )));
            }
        }

        let mut inlets = vec![Vec::new(); segments.len()];
        for (idx, segment) in segments.iter().enumerate().skip(1) {
            if segment.outlet_segment == 0 {
                return Err(WellError::Topology(format!(
                    "segment {} has no outlet, only the top segment may",
                    segment.segment_number
                )));
            }
            let outlet_idx = *number_to_index.get(&segment.outlet_segment).ok_or_else(|| {
                WellError::Topology(format!(
                    "outlet {} of segment {} does not exist",
                    segment.outlet_segment, segment.segment_number
                ))
            })?;
            inlets[outlet_idx].push(idx);
        }

        // walking outlets from any segment must reach the top within n steps
        for (idx, segment) in segments.iter().enumerate() {
            let mut current = idx;
            let mut steps = 0;
            while current != 0 {
                current = number_to_index[&segments[current].outlet_segment];
                steps += 1;
                if steps > segments.len() {
                    return Err(WellError::Topology(format!(
                        "segment {} is part of a cycle",
                        segment.segment_number
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        for segment in &segments {
            for perf in &segment.perforations {
                if !seen.insert(*perf) {
                    return Err(WellError::Topology(format!(
                        "perforation {} is connected to more than one segment",
                        perf
                    )));
                }
            }
        }
        let num_perforations = seen.len();

        Ok(Self {
            segments,
            inlets,
            number_to_index,
            num_perforations,
        })
    }

    pub fn number_of_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn number_of_perforations(&self) -> usize {
        self.num_perforations
    }

    pub fn segment_set(&self) -> &[Segment] {
        &self.segments
    }

    /// inlet segment indices per segment index
    pub fn segment_inlets(&self) -> &[Vec<usize>] {
        &self.inlets
    }

    pub fn segment_perforations(&self, seg: usize) -> &[usize] {
        &self.segments[seg].perforations
    }

    pub fn segment_number_to_index(&self, segment_number: usize) -> Option<usize> {
        self.number_to_index.get(&segment_number).copied()
    }

    /// index of the outlet segment, `None` for the top segment
    pub fn outlet_index(&self, seg: usize) -> Option<usize> {
        match self.segments[seg].outlet_segment {
            0 => None,
            number => self.segment_number_to_index(number),
        }
    }
}
