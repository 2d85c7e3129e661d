use crate::infra::{parse_date, seeded_repository};
use chrono::NaiveDate;
use clap::Args;
use clearance::config::ClearancePolicyConfig;
use clearance::error::AppError;
use clearance::workflows::clearance::{
    ClearanceFormService, ClearanceServiceError, ClearanceSubmission, DailyFees,
    DuplicateReport, PersonnelInput, ProjectId,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Coverage start of the existing form (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-06-01")]
    pub(crate) existing_from: NaiveDate,
    /// Coverage end of the existing form (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-06-10")]
    pub(crate) existing_to: NaiveDate,
    /// Coverage start of the second submission (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-06-05")]
    pub(crate) from: NaiveDate,
    /// Coverage end of the second submission (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, default_value = "2024-06-15")]
    pub(crate) to: NaiveDate,
    /// Personnel name on the second submission
    #[arg(long, default_value = "juan dela cruz")]
    pub(crate) name: String,
    /// Acknowledge the overlap with a duplicate remark
    #[arg(long)]
    pub(crate) remark: Option<String>,
    /// Submit the second form to another project
    #[arg(long)]
    pub(crate) other_project: bool,
}

/// What happened to the second submission.
#[derive(Debug)]
pub(crate) enum DemoOutcome {
    Accepted { reference_number: String },
    Rejected(DuplicateReport),
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Clearance duplicate check demo");
    println!(
        "- Existing SUBMITTED form: Juan Dela Cruz, packaged 5000, {} to {} (PRJ-1)",
        args.existing_from, args.existing_to
    );
    println!(
        "- New submission: {}, packaged 3000, {} to {} ({})",
        args.name,
        args.from,
        args.to,
        if args.other_project { "PRJ-2" } else { "PRJ-1" }
    );

    match simulate(&args)? {
        DemoOutcome::Accepted { reference_number } => {
            println!("Accepted as {reference_number}");
        }
        DemoOutcome::Rejected(report) => {
            println!("Rejected: {}", report.message());
            for entry in &report.personnel {
                for conflict in &entry.conflicts {
                    println!(
                        "  - {} -> {} [{}] {}",
                        entry.personnel_name,
                        conflict.reference_number,
                        conflict.project_name,
                        conflict.reason
                    );
                }
            }
        }
    }

    Ok(())
}

pub(crate) fn simulate(args: &DemoArgs) -> Result<DemoOutcome, AppError> {
    let service = ClearanceFormService::new(
        Arc::new(seeded_repository()),
        ClearancePolicyConfig::default(),
    );

    service.create(ClearanceSubmission {
        project_id: ProjectId("PRJ-1".to_string()),
        coverage_from_date: args.existing_from,
        coverage_to_date: args.existing_to,
        personnel: vec![packaged_personnel("Juan Dela Cruz", 5000.0, None)],
        status: None,
    })?;

    let project = if args.other_project { "PRJ-2" } else { "PRJ-1" };
    let result = service.create(ClearanceSubmission {
        project_id: ProjectId(project.to_string()),
        coverage_from_date: args.from,
        coverage_to_date: args.to,
        personnel: vec![packaged_personnel(
            &args.name,
            3000.0,
            args.remark.clone(),
        )],
        status: None,
    });

    match result {
        Ok(form) => Ok(DemoOutcome::Accepted {
            reference_number: form.reference_number,
        }),
        Err(ClearanceServiceError::Duplicates(report)) => Ok(DemoOutcome::Rejected(report)),
        Err(other) => Err(other.into()),
    }
}

fn packaged_personnel(name: &str, fee: f64, remark: Option<String>) -> PersonnelInput {
    PersonnelInput {
        registered_name: name.to_string(),
        packaged_fee: fee,
        daily_fees: DailyFees::default(),
        remarks: None,
        duplicate_remark: remark,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DemoArgs {
        DemoArgs {
            existing_from: NaiveDate::from_ymd_opt(2024, 6, 1).expect("valid"),
            existing_to: NaiveDate::from_ymd_opt(2024, 6, 10).expect("valid"),
            from: NaiveDate::from_ymd_opt(2024, 6, 5).expect("valid"),
            to: NaiveDate::from_ymd_opt(2024, 6, 15).expect("valid"),
            name: "juan dela cruz".to_string(),
            remark: None,
            other_project: false,
        }
    }

    #[test]
    fn default_scenario_is_rejected() {
        match simulate(&args()).expect("demo runs") {
            DemoOutcome::Rejected(report) => {
                assert_eq!(report.reference_numbers(), vec!["IMCF-2024-00001".to_string()]);
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn remark_lets_the_submission_through() {
        let mut args = args();
        args.remark = Some("covering for absence".to_string());
        assert!(matches!(
            simulate(&args).expect("demo runs"),
            DemoOutcome::Accepted { .. }
        ));
    }

    #[test]
    fn other_project_is_independent() {
        let mut args = args();
        args.other_project = true;
        assert!(matches!(
            simulate(&args).expect("demo runs"),
            DemoOutcome::Accepted { .. }
        ));
    }
}
