use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    DirectDebit, GrowthTrigger, Inputs, MonthRecord, ProjectionEngine, ProjectionError,
    ProjectionResult, RepaymentPolicy, SimulationConfig, StepMode, TakeHomeBreakdown,
    TaxSchedule, format_report, take_home_breakdown,
};

const MAX_HORIZON_YEARS: u32 = 100;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliStepMode {
    ThirtyDay,
    CalendarMonth,
}

impl From<CliStepMode> for StepMode {
    fn from(value: CliStepMode) -> Self {
        match value {
            CliStepMode::ThirtyDay => StepMode::ThirtyDay,
            CliStepMode::CalendarMonth => StepMode::CalendarMonth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliGrowthTrigger {
    AnniversaryMonth,
    EveryTwelveSteps,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiStepMode {
    #[serde(alias = "thirtyDay", alias = "thirty_day", alias = "30-day")]
    ThirtyDay,
    #[serde(alias = "calendarMonth", alias = "calendar_month", alias = "calendar")]
    CalendarMonth,
}

impl From<ApiStepMode> for CliStepMode {
    fn from(value: ApiStepMode) -> Self {
        match value {
            ApiStepMode::ThirtyDay => CliStepMode::ThirtyDay,
            ApiStepMode::CalendarMonth => CliStepMode::CalendarMonth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGrowthTrigger {
    #[serde(alias = "anniversaryMonth", alias = "anniversary_month", alias = "month")]
    AnniversaryMonth,
    #[serde(alias = "everyTwelveSteps", alias = "every_twelve_steps", alias = "yearly")]
    EveryTwelveSteps,
}

impl From<ApiGrowthTrigger> for CliGrowthTrigger {
    fn from(value: ApiGrowthTrigger) -> Self {
        match value {
            ApiGrowthTrigger::AnniversaryMonth => CliGrowthTrigger::AnniversaryMonth,
            ApiGrowthTrigger::EveryTwelveSteps => CliGrowthTrigger::EveryTwelveSteps,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    loan_balance: Option<f64>,
    interest_rate: Option<f64>,
    income: Option<f64>,
    income_growth: Option<f64>,
    threshold: Option<f64>,
    threshold_growth: Option<f64>,
    direct_debit: Option<f64>,
    direct_debit_percent: Option<f64>,
    investment_percent: Option<f64>,
    fixed_contribution: Option<f64>,
    pension_percent: Option<f64>,

    start_date: Option<String>,
    horizon_years: Option<u32>,
    step_mode: Option<ApiStepMode>,
    growth_trigger: Option<ApiGrowthTrigger>,
    growth_month: Option<u32>,
    repayment_rate: Option<f64>,
    floor_repayment_at_zero: Option<bool>,
    minimum_repayment_income: Option<f64>,
    exclude_repayment_from_take_home: Option<bool>,
    horizon_return: Option<f64>,

    trace: Option<bool>,
}

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Student loan payoff and 30-year net worth projection (UK 2023/24 tax and NI)"
)]
struct Cli {
    #[arg(long, default_value_t = 43_050.33)]
    loan_balance: f64,
    #[arg(long, default_value_t = 7.3, help = "Annual loan interest rate in percent")]
    interest_rate: f64,
    #[arg(long, default_value_t = 60_000.0, help = "Gross annual income")]
    income: f64,
    #[arg(long, default_value_t = 3.0, help = "Yearly income growth in percent")]
    income_growth_rate: f64,
    #[arg(long, default_value_t = 28_470.0, help = "Repayment threshold")]
    threshold: f64,
    #[arg(long, default_value_t = 0.0, help = "Yearly threshold growth in percent")]
    threshold_growth_rate: f64,
    #[arg(long, default_value_t = 750.0, help = "Voluntary monthly repayment")]
    direct_debit: f64,
    #[arg(
        long,
        help = "Voluntary repayment as a percent of monthly take-home; overrides --direct-debit"
    )]
    direct_debit_percent: Option<f64>,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Percent of monthly take-home invested"
    )]
    investment_percent: f64,
    #[arg(
        long,
        default_value_t = 500.0,
        help = "Fixed monthly investment once the loan is cleared"
    )]
    fixed_monthly_contribution: f64,
    #[arg(long, default_value_t = 0.0, help = "Pension contribution in percent of gross")]
    pension_percent: f64,
    #[arg(long, default_value = "2023-09-01", help = "Simulation start date (YYYY-MM-DD)")]
    start_date: String,
    #[arg(long, default_value_t = 30)]
    horizon_years: u32,
    #[arg(long, value_enum, default_value_t = CliStepMode::ThirtyDay)]
    step_mode: CliStepMode,
    #[arg(long, value_enum, default_value_t = CliGrowthTrigger::AnniversaryMonth)]
    growth_trigger: CliGrowthTrigger,
    #[arg(
        long,
        default_value_t = 4,
        help = "Calendar month used by the anniversary-month growth trigger"
    )]
    growth_month: u32,
    #[arg(long, default_value_t = 9.0, help = "Repayment rate in percent")]
    repayment_rate: f64,
    #[arg(long, help = "Never let the mandatory repayment go negative")]
    floor_repayment_at_zero: bool,
    #[arg(long, help = "Income below which no mandatory repayment is taken")]
    minimum_repayment_income: Option<f64>,
    #[arg(long, help = "Do not deduct the mandatory repayment from take-home pay")]
    exclude_repayment_from_take_home: bool,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Annual return on assets after payoff in percent"
    )]
    horizon_return_rate: f64,
    #[arg(long, help = "Print every simulated month after the summary")]
    trace: bool,
}

#[derive(Debug)]
struct ProjectionRequest {
    config: SimulationConfig,
    inputs: Inputs,
    trace: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    result: ProjectionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<Vec<MonthRecord>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ProjectionRequest, String> {
    let start_date = NaiveDate::parse_from_str(&cli.start_date, "%Y-%m-%d")
        .map_err(|e| format!("--start-date must be YYYY-MM-DD: {e}"))?;

    if !(1..=12).contains(&cli.growth_month) {
        return Err("--growth-month must be between 1 and 12".to_string());
    }

    if cli.horizon_years == 0 || cli.horizon_years > MAX_HORIZON_YEARS {
        return Err(format!("--horizon-years must be between 1 and {MAX_HORIZON_YEARS}"));
    }

    let growth_trigger = match cli.growth_trigger {
        CliGrowthTrigger::AnniversaryMonth => GrowthTrigger::AnniversaryMonth(cli.growth_month),
        CliGrowthTrigger::EveryTwelveSteps => GrowthTrigger::EveryTwelveSteps,
    };
    let direct_debit = match cli.direct_debit_percent {
        Some(percent) => DirectDebit::ShareOfTakeHome(percent),
        None => DirectDebit::Fixed(cli.direct_debit),
    };

    Ok(ProjectionRequest {
        config: SimulationConfig {
            start_date,
            horizon_years: cli.horizon_years,
            step_mode: cli.step_mode.into(),
            growth_trigger,
            tax_schedule: TaxSchedule::uk_2023_24(),
            repayment: RepaymentPolicy {
                rate_percent: cli.repayment_rate,
                floor_at_zero: cli.floor_repayment_at_zero,
                minimum_income: cli.minimum_repayment_income,
            },
            pension_percent: cli.pension_percent,
            deduct_repayment_from_pay: !cli.exclude_repayment_from_take_home,
            horizon_annual_return_percent: cli.horizon_return_rate,
        },
        inputs: Inputs {
            loan_balance: cli.loan_balance,
            annual_interest_rate: cli.interest_rate,
            income: cli.income,
            income_growth_percent: cli.income_growth_rate,
            threshold: cli.threshold,
            threshold_growth_percent: cli.threshold_growth_rate,
            direct_debit,
            investment_percent: cli.investment_percent,
            fixed_monthly_contribution: cli.fixed_monthly_contribution,
        },
        trace: cli.trace,
    })
}

fn run_request(request: &ProjectionRequest) -> Result<ProjectResponse, ProjectionError> {
    let engine = ProjectionEngine::new(request.config.clone())?;
    if request.trace {
        let (result, trace) = engine.run_with_trace(&request.inputs)?;
        Ok(ProjectResponse {
            result,
            trace: Some(trace),
        })
    } else {
        Ok(ProjectResponse {
            result: engine.run(&request.inputs)?,
            trace: None,
        })
    }
}

pub fn run_cli(args: Vec<String>) -> Result<(), String> {
    let cli = Cli::parse_from(args);
    let request = build_request(cli)?;
    let response = run_request(&request).map_err(|e| e.to_string())?;

    print!(
        "{}",
        format_report(&request.inputs, &request.config, &response.result)
    );

    if let Some(trace) = response.trace {
        println!();
        println!(
            "step,date,phase,loan,income,threshold,take_home,mandatory,discretionary,contribution,total"
        );
        for row in trace {
            println!(
                "{},{},{:?},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2},{:.2}",
                row.step,
                row.date,
                row.phase,
                row.loan_balance,
                row.income,
                row.threshold,
                row.take_home_monthly,
                row.mandatory_payment,
                row.discretionary_payment,
                row.contribution,
                row.running_total
            );
        }
    }

    Ok(())
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/take-home",
            get(take_home_get_handler).post(take_home_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!("payoff HTTP API listening on http://{addr}");
    println!("Payoff HTTP API listening on http://{addr}");
    println!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    project_handler_impl(payload).await
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    debug!("projecting {:?}", request.inputs);

    match run_request(&request) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(e) => error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string()),
    }
}

async fn take_home_get_handler(Query(payload): Query<ProjectPayload>) -> Response {
    take_home_handler_impl(payload).await
}

async fn take_home_post_handler(Json(payload): Json<ProjectPayload>) -> Response {
    take_home_handler_impl(payload).await
}

async fn take_home_handler_impl(payload: ProjectPayload) -> Response {
    match take_home_from_payload(payload) {
        Ok(breakdown) => json_response(StatusCode::OK, breakdown),
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ProjectionRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn take_home_from_payload(payload: ProjectPayload) -> Result<TakeHomeBreakdown, String> {
    let request = api_request_from_payload(payload)?;
    Ok(take_home_breakdown(
        &request.config,
        request.inputs.income,
        request.config.pension_percent,
        request.inputs.threshold,
    ))
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ProjectionRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.loan_balance {
        cli.loan_balance = v;
    }
    if let Some(v) = payload.interest_rate {
        cli.interest_rate = v;
    }
    if let Some(v) = payload.income {
        cli.income = v;
    }
    if let Some(v) = payload.income_growth {
        cli.income_growth_rate = v;
    }
    if let Some(v) = payload.threshold {
        cli.threshold = v;
    }
    if let Some(v) = payload.threshold_growth {
        cli.threshold_growth_rate = v;
    }
    if let Some(v) = payload.direct_debit {
        cli.direct_debit = v;
    }
    if payload.direct_debit_percent.is_some() {
        cli.direct_debit_percent = payload.direct_debit_percent;
    }
    if let Some(v) = payload.investment_percent {
        cli.investment_percent = v;
    }
    if let Some(v) = payload.fixed_contribution {
        cli.fixed_monthly_contribution = v;
    }
    if let Some(v) = payload.pension_percent {
        cli.pension_percent = v;
    }

    if let Some(v) = payload.start_date {
        cli.start_date = v;
    }
    if let Some(v) = payload.horizon_years {
        cli.horizon_years = v;
    }
    if let Some(v) = payload.step_mode {
        cli.step_mode = v.into();
    }
    if let Some(v) = payload.growth_trigger {
        cli.growth_trigger = v.into();
    }
    if let Some(v) = payload.growth_month {
        cli.growth_month = v;
    }
    if let Some(v) = payload.repayment_rate {
        cli.repayment_rate = v;
    }
    if let Some(v) = payload.floor_repayment_at_zero {
        cli.floor_repayment_at_zero = v;
    }
    if payload.minimum_repayment_income.is_some() {
        cli.minimum_repayment_income = payload.minimum_repayment_income;
    }
    if let Some(v) = payload.exclude_repayment_from_take_home {
        cli.exclude_repayment_from_take_home = v;
    }
    if let Some(v) = payload.horizon_return {
        cli.horizon_return_rate = v;
    }
    if let Some(v) = payload.trace {
        cli.trace = v;
    }

    build_request(cli).map_err(|msg| msg.replace("--", ""))
}

fn default_cli_for_api() -> Cli {
    Cli {
        loan_balance: 43_050.33,
        interest_rate: 7.3,
        income: 60_000.0,
        income_growth_rate: 3.0,
        threshold: 28_470.0,
        threshold_growth_rate: 0.0,
        direct_debit: 750.0,
        direct_debit_percent: None,
        investment_percent: 10.0,
        fixed_monthly_contribution: 500.0,
        pension_percent: 0.0,
        start_date: "2023-09-01".to_string(),
        horizon_years: 30,
        step_mode: CliStepMode::ThirtyDay,
        growth_trigger: CliGrowthTrigger::AnniversaryMonth,
        growth_month: 4,
        repayment_rate: 9.0,
        floor_repayment_at_zero: false,
        minimum_repayment_income: None,
        exclude_repayment_from_take_home: false,
        horizon_return_rate: 5.0,
        trace: false,
    }
}
