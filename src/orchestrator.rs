//! Drives the calculator: field edits in, requests out, results rendered.
//!
//! Everything runs on one task. Network calls are spawned and report back
//! through a channel tagged with a sequence number, so a slow older answer
//! can never overwrite a newer one.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::api::{ApiError, IntegralBackend, IntegralRequest, IntegralResponse};
use crate::chart::{
  build_chart, ChartEngine, ChartSurface, RenderedChart, SvgChartEngine,
};
use crate::debounce::Debouncer;
use crate::form::{FieldChange, FormSnapshot, FormState};
use crate::formula::{
  format_expression, integral_notation, FormulaRenderer, MathNode,
  RenderScope, SharedNode,
};
use crate::settings::Settings;
use crate::validation::{validate_form, FormErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
  Idle,
  Validating,
  Requesting,
  Succeeded,
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
  Checking,
  Connected,
  NotConnected,
}

/// A finished network call, as reported back to the orchestrator.
#[derive(Debug)]
pub struct Completion {
  pub seq: u64,
  pub request: IntegralRequest,
  pub result: Result<IntegralResponse, ApiError>,
}

/// What a front end needs to draw the calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
  pub phase: Phase,
  pub form: FormState,
  pub errors: FormErrors,
  pub error: Option<String>,
  pub banner: Option<String>,
  pub backend_status: BackendStatus,
  pub response: Option<IntegralResponse>,
  pub chart: Option<RenderedChart>,
  pub formula_html: String,
  pub integral_markup: Option<String>,
}

pub trait Presenter {
  fn present(&mut self, view: &ViewState);
}

impl<F: FnMut(&ViewState)> Presenter for F {
  fn present(&mut self, view: &ViewState) {
    self(view)
  }
}

pub struct FormOrchestrator<B: IntegralBackend, E: ChartEngine = SvgChartEngine>
{
  backend: Arc<B>,
  form: FormState,
  errors: FormErrors,
  phase: Phase,
  response: Option<IntegralResponse>,
  error: Option<String>,
  banner: Option<String>,
  backend_status: BackendStatus,
  chart: ChartSurface<E>,
  renderer: FormulaRenderer,
  formula_html: String,
  integral_node: SharedNode,
  render_scope: RenderScope,
  render_delay: Duration,
  debouncer: Debouncer<FormSnapshot>,
  next_seq: u64,
  applied_seq: u64,
  in_flight: usize,
  completions_tx: mpsc::UnboundedSender<Completion>,
  completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<B: IntegralBackend, E: ChartEngine> FormOrchestrator<B, E> {
  pub fn new(
    backend: B,
    renderer: FormulaRenderer,
    chart_engine: E,
    settings: &Settings,
  ) -> Self {
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();
    let form = FormState::default();
    let mut orchestrator = Self {
      backend: Arc::new(backend),
      errors: validate_form(&form),
      form,
      phase: Phase::Idle,
      response: None,
      error: None,
      banner: None,
      backend_status: BackendStatus::Checking,
      chart: ChartSurface::new(chart_engine),
      renderer,
      formula_html: String::new(),
      integral_node: Arc::new(Mutex::new(MathNode::default())),
      render_scope: RenderScope::new(),
      render_delay: settings.render_delay(),
      debouncer: Debouncer::new(settings.debounce()),
      next_seq: 0,
      applied_seq: 0,
      in_flight: 0,
      completions_tx,
      completions_rx,
    };
    orchestrator.refresh_formula();
    orchestrator
  }

  /// Start from a different form instead of the defaults.
  pub fn with_form(mut self, form: FormState) -> Self {
    self.errors = validate_form(&form);
    self.form = form;
    self.refresh_formula();
    self
  }

  pub fn form(&self) -> &FormState {
    &self.form
  }

  pub fn errors(&self) -> &FormErrors {
    &self.errors
  }

  pub fn phase(&self) -> Phase {
    self.phase
  }

  pub fn response(&self) -> Option<&IntegralResponse> {
    self.response.as_ref()
  }

  /// Top-level error message (transport or domain).
  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// "Backend unavailable" banner set by a failed connectivity probe.
  pub fn banner(&self) -> Option<&str> {
    self.banner.as_deref()
  }

  pub fn backend_status(&self) -> BackendStatus {
    self.backend_status
  }

  pub fn chart(&self) -> Option<&RenderedChart> {
    self.chart.current()
  }

  pub fn formula_html(&self) -> &str {
    &self.formula_html
  }

  pub fn in_flight(&self) -> usize {
    self.in_flight
  }

  /// Markup of the integral notation once the deferred pass has run.
  pub fn integral_markup(&self) -> Option<String> {
    self
      .integral_node
      .lock()
      .unwrap_or_else(|p| p.into_inner())
      .markup
      .clone()
  }

  /// LaTeX to show: the backend's when it has answered, otherwise the local
  /// preview of the current expression.
  pub fn displayed_latex(&self) -> String {
    match &self.response {
      Some(response) if !response.latex_expression.is_empty() => {
        response.latex_expression.clone()
      }
      _ => format_expression(&self.form.expression),
    }
  }

  pub fn view(&self) -> ViewState {
    ViewState {
      phase: self.phase,
      form: self.form.clone(),
      errors: self.errors.clone(),
      error: self.error.clone(),
      banner: self.banner.clone(),
      backend_status: self.backend_status,
      response: self.response.clone(),
      chart: self.chart.current().cloned(),
      formula_html: self.formula_html.clone(),
      integral_markup: self.integral_markup(),
    }
  }

  /// Probe the backend. A failure raises the unavailable banner.
  pub async fn probe(&mut self) -> bool {
    self.backend_status = BackendStatus::Checking;
    let connected = self.backend.test_connection().await;
    if connected {
      self.backend_status = BackendStatus::Connected;
      self.banner = None;
    } else {
      log::warn!("backend at {} is not reachable", self.backend.base_url());
      self.backend_status = BackendStatus::NotConnected;
      self.banner = Some(format!(
        "Backend server is not available. Please make sure it is running on {}",
        self.backend.base_url()
      ));
    }
    connected
  }

  /// Initial load: probe, then calculate once if the form is already valid,
  /// whatever the probe said.
  pub async fn start(&mut self) {
    self.probe().await;
    self.debouncer.seed(self.form.snapshot());
    if validate_form(&self.form).is_valid() {
      self.dispatch();
    }
  }

  /// Apply one edit and (re)arm the debounce timer.
  pub fn apply_change(&mut self, change: FieldChange, now: Instant) {
    log::debug!("field change: {change:?}");
    if let Err(e) = self.form.apply(change) {
      log::warn!("{e}");
      return;
    }
    self.errors = validate_form(&self.form);
    self.refresh_formula();
    self.debouncer.push(self.form.snapshot(), now);
  }

  /// Validate and, if the form passes, produce the next numbered request.
  ///
  /// A failing form marks every field touched and sends nothing.
  pub fn submit(&mut self) -> Option<(u64, IntegralRequest)> {
    self.phase = Phase::Validating;
    self.errors = validate_form(&self.form);

    let request = match self.form.to_request() {
      Some(request) if self.errors.is_valid() => request,
      _ => {
        log::debug!("form invalid: {:?}", self.errors.messages());
        self.form.mark_all_touched();
        self.phase = Phase::Failed;
        return None;
      }
    };

    self.next_seq += 1;
    self.in_flight += 1;
    self.error = None;
    self.phase = Phase::Requesting;
    Some((self.next_seq, request))
  }

  /// Submit and spawn the network call. Needs a Tokio runtime.
  pub fn dispatch(&mut self) {
    let Some((seq, request)) = self.submit() else {
      return;
    };
    log::debug!("request #{seq}: {request:?}");

    let backend = Arc::clone(&self.backend);
    let tx = self.completions_tx.clone();
    tokio::spawn(async move {
      let result = backend.calculate_integral(request.clone()).await;
      // The receiver only goes away with the orchestrator itself.
      let _ = tx.send(Completion {
        seq,
        request,
        result,
      });
    });
  }

  /// Apply a finished call. Answers older than the last applied one are
  /// dropped.
  pub fn complete(&mut self, completion: Completion) {
    self.in_flight = self.in_flight.saturating_sub(1);
    let Completion {
      seq,
      request,
      result,
    } = completion;

    if seq < self.applied_seq {
      log::debug!(
        "dropping stale response #{seq} (have #{})",
        self.applied_seq
      );
      return;
    }
    self.applied_seq = seq;

    match result {
      Ok(response) => self.succeed(response, &request),
      Err(e) => self.fail(e),
    }
  }

  fn succeed(&mut self, response: IntegralResponse, request: &IntegralRequest) {
    log::debug!("area = {}", response.area);
    self.error = response.error.clone();
    self.backend_status = BackendStatus::Connected;
    self.banner = None;

    let spec = build_chart(&response, request.start_x, request.end_x);
    if let Err(e) = self.chart.rebuild(&spec) {
      log::warn!("{e}");
    }

    {
      let mut node =
        self.integral_node.lock().unwrap_or_else(|p| p.into_inner());
      node.set_source(integral_notation(
        &response.latex_expression,
        request.start_x,
        request.end_x,
      ));
    }
    self.response = Some(response);
    self.phase = Phase::Succeeded;
    self.refresh_formula();
    self.renderer.schedule(
      &mut self.render_scope,
      Arc::clone(&self.integral_node),
      self.render_delay,
    );
  }

  fn fail(&mut self, error: ApiError) {
    log::warn!("integral request failed: {error}");
    self.error = Some(error.user_message());
    self.response = None;
    self.chart.dispose();
    self.phase = Phase::Failed;
    self.refresh_formula();
  }

  fn refresh_formula(&mut self) {
    self.formula_html = self.renderer.render(&self.displayed_latex());
  }

  /// Tear down the chart and cancel pending deferred renders.
  pub fn dispose(&mut self) {
    self.chart.dispose();
    self.render_scope.dispose();
  }

  /// Event loop. Runs until `events` is closed, the pending edit (if any)
  /// has been flushed and every in-flight call has reported back.
  pub async fn run(
    mut self,
    mut events: mpsc::Receiver<FieldChange>,
    presenter: &mut impl Presenter,
  ) -> Self {
    self.start().await;
    presenter.present(&self.view());

    let mut events_open = true;
    loop {
      if !events_open && !self.debouncer.is_pending() && self.in_flight == 0 {
        break;
      }

      let deadline = self.debouncer.deadline();
      tokio::select! {
        change = events.recv(), if events_open => match change {
          Some(change) => {
            self.apply_change(change, Instant::now());
            presenter.present(&self.view());
          }
          None => {
            events_open = false;
            if self.debouncer.flush().is_some() {
              self.dispatch();
              presenter.present(&self.view());
            }
          }
        },
        _ = sleep_until(deadline.unwrap_or_else(Instant::now)),
          if deadline.is_some() =>
        {
          if self.debouncer.poll(Instant::now()).is_some() {
            self.dispatch();
            presenter.present(&self.view());
          }
        },
        Some(completion) = self.completions_rx.recv() => {
          self.complete(completion);
          presenter.present(&self.view());
        },
      }
    }

    self
  }
}
