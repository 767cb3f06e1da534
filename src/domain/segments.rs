use crate::domain::models::{PlanBlueprint, Portion, Segment, UnitRange};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentPlan {
    pub midterm_segments: Vec<Segment>,
    pub final_segments: Vec<Segment>,
}

/// Expands subjects into (subject, unit, part) tasks for both exam portions.
/// Ordering is subject-major, then unit, then part.
pub fn plan_segments(total_subjects: u32, blueprint: &PlanBlueprint) -> SegmentPlan {
    SegmentPlan {
        midterm_segments: expand(
            total_subjects,
            blueprint.midterm_units,
            &blueprint.part_labels,
            Portion::Midterm,
        ),
        final_segments: expand(
            total_subjects,
            blueprint.final_units,
            &blueprint.part_labels,
            Portion::Final,
        ),
    }
}

fn expand(total_subjects: u32, units: UnitRange, labels: &[String], portion: Portion) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(total_subjects as usize * units.count() * labels.len());
    for subject in 1..=total_subjects {
        for unit in units.units() {
            for label in labels {
                segments.push(Segment {
                    subject,
                    unit,
                    part: label.clone(),
                    portion,
                });
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn two_subjects_produce_expected_counts() {
        let plan = plan_segments(2, &PlanBlueprint::default());
        assert_eq!(plan.midterm_segments.len(), 18);
        assert_eq!(plan.final_segments.len(), 12);
    }

    #[test]
    fn segments_follow_subject_unit_part_order() {
        let blueprint = PlanBlueprint::default();
        let plan = plan_segments(2, &blueprint);

        let first = &plan.midterm_segments[0];
        assert_eq!((first.subject, first.unit), (1, 1));
        assert_eq!(first.part, blueprint.part_labels[0]);

        let third = &plan.midterm_segments[2];
        assert_eq!((third.subject, third.unit), (1, 1));
        assert_eq!(third.part, blueprint.part_labels[2]);

        let fourth = &plan.midterm_segments[3];
        assert_eq!((fourth.subject, fourth.unit), (1, 2));

        let tenth = &plan.midterm_segments[9];
        assert_eq!((tenth.subject, tenth.unit), (2, 1));

        let final_first = &plan.final_segments[0];
        assert_eq!((final_first.subject, final_first.unit), (1, 4));
        assert_eq!(final_first.portion, Portion::Final);
        assert!(plan.midterm_segments.iter().all(|segment| segment.portion == Portion::Midterm));
    }

    #[test]
    fn zero_subjects_produce_no_segments() {
        assert_eq!(plan_segments(0, &PlanBlueprint::default()), SegmentPlan::default());
    }

    proptest! {
        #[test]
        fn segment_counts_scale_with_subjects(total in 1u32..40u32) {
            let plan = plan_segments(total, &PlanBlueprint::default());
            prop_assert_eq!(plan.midterm_segments.len(), total as usize * 9);
            prop_assert_eq!(plan.final_segments.len(), total as usize * 6);

            let subjects = plan
                .midterm_segments
                .iter()
                .map(|segment| (segment.subject, segment.unit))
                .collect::<Vec<_>>();
            let mut sorted = subjects.clone();
            sorted.sort();
            prop_assert_eq!(subjects, sorted);
        }
    }
}
