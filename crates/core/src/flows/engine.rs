use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::catalog::AssemblyPricing;
use crate::domain::request::{bounds, ExtraRoute, Lifting, QuoteRequest, StorageRequest, VolumeClass, Zone};
use crate::domain::FurnitureCategory;
use crate::errors::DomainError;
use crate::flows::session::{FurnitureDraft, SessionState, DEFAULT_SESSION_TIMEOUT_SECS};
use crate::flows::states::{Button, Choice, DialogEffect, DialogState, Prompt, UserAction};
use crate::flows::validation::{parse_decimal, parse_int, parse_positive_decimal, InputError};
use crate::pricing::{PricingResult, QuoteEngine};
use crate::rates::table::RateTable;

/// Broken session invariants. The caller drops the session and asks the user to `/start` again.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("no furniture draft while in state {state}")]
    MissingDraft { state: &'static str },
    #[error("missing {field} while in state {state}")]
    MissingField { field: &'static str, state: &'static str },
    #[error("collected request is invalid: {0}")]
    InvalidRequest(#[from] DomainError),
}

/// Result of one handled action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogReply {
    pub from: DialogState,
    pub state: DialogState,
    pub notices: Vec<String>,
    pub prompt: Option<Prompt>,
    pub pricing: Option<PricingResult>,
    pub effects: Vec<DialogEffect>,
    pub rejection: Option<InputError>,
}

enum Target {
    State(DialogState),
    Compute,
}

struct Transition {
    target: Target,
    notice: Option<String>,
    effects: Vec<DialogEffect>,
}

impl Transition {
    fn to(state: DialogState) -> Self {
        Self { target: Target::State(state), notice: None, effects: Vec::new() }
    }

    fn compute() -> Self {
        Self { target: Target::Compute, notice: None, effects: Vec::new() }
    }

    fn notice(mut self, notice: impl Into<String>) -> Self {
        self.notice = Some(notice.into());
        self
    }

    fn effect(mut self, effect: DialogEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

enum StepError {
    Input(InputError),
    Fatal(DialogError),
}

impl From<InputError> for StepError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}

impl From<DialogError> for StepError {
    fn from(value: DialogError) -> Self {
        Self::Fatal(value)
    }
}

type StepResult = Result<Transition, StepError>;

/// Drives a [`SessionState`] through the quote dialogue and prices the result.
pub struct DialogController<E> {
    engine: E,
    session_timeout: Duration,
}

impl<E> DialogController<E>
where
    E: QuoteEngine,
{
    pub fn new(engine: E) -> Self {
        Self { engine, session_timeout: Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS as i64) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn session_timeout(&self) -> Duration {
        self.session_timeout
    }

    /// Prompt for the current state, derived only from the session.
    pub fn prompt(&self, session: &SessionState, rates: &RateTable) -> Option<Prompt> {
        prompt_for(session, rates)
    }

    pub fn handle(
        &self,
        session: &mut SessionState,
        action: UserAction,
        rates: &RateTable,
        now: DateTime<Utc>,
    ) -> Result<DialogReply, DialogError> {
        let from = session.state;
        let mut notices = Vec::new();

        if from != DialogState::MainMenu && session.is_expired(now, self.session_timeout) {
            session.reset(now);
            notices.push("Your previous quote expired after inactivity. Let's start over.".to_owned());
            return Ok(self.reply(from, session, rates, notices, None, Vec::new(), None));
        }
        session.touch(now);

        let step = match action {
            UserAction::Start => {
                session.reset(now);
                Ok(Transition::to(DialogState::MainMenu))
            }
            UserAction::Cancel => {
                session.reset(now);
                Ok(Transition::to(DialogState::Ended)
                    .notice("Quote cancelled. Send /start to begin again.")
                    .effect(DialogEffect::EndSession))
            }
            UserAction::Choose(Choice::Back) => match back_target(session) {
                Some(target) => Ok(Transition::to(target)),
                None => Err(InputError::UnexpectedChoice.into()),
            },
            UserAction::Choose(choice) => self.check_offered(session, choice, rates).and_then(|()| {
                step_choice(session, choice, rates)
            }),
            UserAction::Text(text) => {
                if session.state.expects_text() {
                    step_text(session, &text)
                } else {
                    Err(InputError::ButtonExpected.into())
                }
            }
        };

        match step {
            Ok(transition) => {
                notices.extend(transition.notice);
                let pricing = match transition.target {
                    Target::State(state) => {
                        session.state = state;
                        None
                    }
                    Target::Compute => Some(self.compute(session, rates)?),
                };
                Ok(self.reply(from, session, rates, notices, pricing, transition.effects, None))
            }
            Err(StepError::Input(error)) => {
                notices.push(error.to_string());
                Ok(self.reply(from, session, rates, notices, None, Vec::new(), Some(error)))
            }
            Err(StepError::Fatal(error)) => Err(error),
        }
    }

    pub fn handle_with_audit<S>(
        &self,
        session: &mut SessionState,
        action: UserAction,
        rates: &RateTable,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<DialogReply, DialogError>
    where
        S: AuditSink + ?Sized,
    {
        let described = action.describe();
        let from = session.state;
        let result = self.handle(session, action, rates, now);

        match &result {
            Ok(reply) => {
                let (event_type, outcome) = match reply.rejection {
                    Some(_) => ("dialog.input_rejected", AuditOutcome::Rejected),
                    None => ("dialog.transition_applied", AuditOutcome::Success),
                };
                let mut event = AuditEvent::from_context(audit, event_type, AuditCategory::Flow, outcome)
                    .with_metadata("from", reply.from.name())
                    .with_metadata("to", reply.state.name())
                    .with_metadata("action", described);
                if let Some(rejection) = &reply.rejection {
                    event = event.with_metadata("reason", rejection.to_string());
                }
                sink.emit(event);

                if let Some(pricing) = &reply.pricing {
                    sink.emit(
                        AuditEvent::from_context(
                            audit,
                            "pricing.quote_computed",
                            AuditCategory::Pricing,
                            AuditOutcome::Success,
                        )
                        .with_metadata("total", pricing.quote.total.to_string())
                        .with_metadata("lines", pricing.quote.lines.len().to_string()),
                    );
                }
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::from_context(
                        audit,
                        "dialog.transition_failed",
                        AuditCategory::Flow,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("from", from.name())
                    .with_metadata("action", described)
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }

    fn check_offered(
        &self,
        session: &SessionState,
        choice: Choice,
        rates: &RateTable,
    ) -> Result<(), StepError> {
        if matches!(choice, Choice::ViewPrices | Choice::RefreshPrices) && !session.is_admin {
            return Err(InputError::AdminOnly.into());
        }
        if session.state.expects_text() {
            return Err(InputError::TextExpected.into());
        }
        match prompt_for(session, rates) {
            Some(prompt) if prompt.offers(choice) => Ok(()),
            _ => Err(InputError::UnexpectedChoice.into()),
        }
    }

    fn compute(&self, session: &mut SessionState, rates: &RateTable) -> Result<PricingResult, DialogError> {
        session.request.validate()?;
        let result = self.engine.price(&session.request, rates);
        session.state = DialogState::Quoted;
        Ok(result)
    }

    #[allow(clippy::too_many_arguments)]
    fn reply(
        &self,
        from: DialogState,
        session: &SessionState,
        rates: &RateTable,
        notices: Vec<String>,
        pricing: Option<PricingResult>,
        effects: Vec<DialogEffect>,
        rejection: Option<InputError>,
    ) -> DialogReply {
        DialogReply {
            from,
            state: session.state,
            notices,
            prompt: prompt_for(session, rates),
            pricing,
            effects,
            rejection,
        }
    }
}

fn step_choice(session: &mut SessionState, choice: Choice, rates: &RateTable) -> StepResult {
    use DialogState as S;

    let zone = session.request.zone;
    let transition = match (session.state, choice) {
        (S::MainMenu, Choice::StartDelivery) => {
            session.request = QuoteRequest::default();
            session.draft = None;
            session.shared_floor = None;
            session.shared_elevator = None;
            Transition::to(S::AddressZone)
        }
        (S::MainMenu, Choice::StartStorage) => {
            session.request = QuoteRequest { storage_only: true, ..QuoteRequest::default() };
            session.draft = None;
            Transition::to(S::StorageDays)
        }
        (S::MainMenu, Choice::ViewPrices) => {
            Transition::to(S::ViewPrices).effect(DialogEffect::ShowPriceList)
        }
        (S::MainMenu, Choice::RefreshPrices) => {
            Transition::to(S::MainMenu).effect(DialogEffect::RefreshRates)
        }
        (S::AddressZone, Choice::Zone(chosen)) => {
            let request = &mut session.request;
            request.zone = Some(chosen);
            request.boundary_distance_km = 0;
            request.extra_routes.clear();
            request.carry_count = 0;
            request.door_distance_m = None;
            let next = match chosen {
                Zone::Far => S::BoundaryDistance,
                Zone::Near => S::AddStop,
            };
            Transition::to(next).notice(format!("Address: {}", chosen.label()))
        }
        (S::AddStop, Choice::AddStop) => Transition::to(S::RouteFrom),
        (S::AddStop, Choice::FinishStops) => Transition::to(S::CarryQuestion),
        (S::RouteFrom, Choice::Zone(from)) => Transition::to(S::RouteTo { from }),
        (S::RouteTo { from }, Choice::Zone(to)) => {
            if from == Zone::Near && to == Zone::Near {
                session.request.extra_routes.push(ExtraRoute { from, to, distance_km: 0 });
                Transition::to(S::AddStop).notice("Route Near → Near added")
            } else {
                Transition::to(S::RouteDistance { from, to })
            }
        }
        (S::CarryQuestion, Choice::Yes) => Transition::to(S::CarryCount),
        (S::CarryQuestion, Choice::No) => match zone {
            Some(Zone::Far) => Transition::to(S::DoorDistance),
            _ => {
                session.request.carry_count = 0;
                Transition::to(S::Volume)
            }
        },
        (S::Volume, Choice::Volume(class)) => {
            session.request.volume_class = Some(class);
            Transition::to(S::DeliveryOnly).notice(format!("Volume: {}", class.label()))
        }
        (S::DeliveryOnly, Choice::Yes) => {
            session.request.delivery_only = true;
            session.request.furniture_items.clear();
            session.request.storage_requested = false;
            session.request.storage = None;
            session.draft = None;
            Transition::compute()
        }
        (S::DeliveryOnly, Choice::No) => {
            session.request.delivery_only = false;
            match zone {
                Some(Zone::Far) => Transition::to(S::FurnitureCategory),
                _ => Transition::to(S::SharedFloor),
            }
        }
        (S::SharedElevator, Choice::Yes | Choice::No) => {
            session.shared_elevator = Some(choice == Choice::Yes);
            Transition::to(S::FurnitureCategory)
        }
        (S::FurnitureCategory, Choice::Category(category)) => {
            Transition::to(S::FurnitureKind { category })
        }
        (S::FurnitureKind { .. }, Choice::Kind(kind)) => match rates.lifting(kind) {
            Some(rate) => {
                // table defaults outside the accepted range would fail validation at compute
                let places = rate.places_count.clamp(*bounds::PLACES.start(), *bounds::PLACES.end());
                session.draft = Some(FurnitureDraft::new(kind, places));
                Transition::to(S::PlacesConfirm)
            }
            None => {
                session.draft = Some(FurnitureDraft::new(kind, 1));
                after_lifting(session)?
            }
        },
        (S::PlacesConfirm, Choice::KeepPlaces) => Transition::to(S::LiftingNeeded),
        (S::PlacesConfirm, Choice::ChangePlaces) => Transition::to(S::PlacesInput),
        (S::LiftingNeeded, Choice::No) => {
            draft_mut(session)?.lifting = None;
            after_lifting(session)?
        }
        (S::LiftingNeeded, Choice::Yes) => match (zone, session.shared_floor) {
            (Some(Zone::Near), Some(floor)) => {
                let elevator = session.shared_elevator.unwrap_or(false);
                draft_mut(session)?.floor = Some(floor);
                lift_decision(session, elevator)?
            }
            _ => Transition::to(S::ItemFloor),
        },
        (S::ItemElevator, Choice::Yes | Choice::No) => lift_decision(session, choice == Choice::Yes)?,
        (S::SplitMethod, Choice::AllByElevator) => {
            let draft = draft_mut(session)?;
            let floor = draft.floor.unwrap_or(1);
            draft.lifting = Some(Lifting::by_elevator(floor, draft.places_count));
            after_lifting(session)?
        }
        (S::SplitMethod, Choice::MixedLift) => Transition::to(S::ElevatorPlaces),
        (S::Assembly, Choice::Yes) => {
            let draft = draft_mut(session)?;
            draft.assembly_needed = true;
            if draft.kind.is_value_based() {
                Transition::to(S::DeclaredValue)
            } else {
                finish_item(session)?
            }
        }
        (S::Assembly, Choice::No) => {
            let draft = draft_mut(session)?;
            draft.assembly_needed = false;
            draft.declared_value = None;
            finish_item(session)?
        }
        (S::AddAnotherItem, Choice::Yes) => Transition::to(S::FurnitureCategory),
        (S::AddAnotherItem, Choice::No) => Transition::to(S::StorageQuestion),
        (S::StorageQuestion, Choice::Yes) => {
            session.request.storage_requested = true;
            Transition::to(S::StorageDays)
        }
        (S::StorageQuestion, Choice::No) => {
            session.request.storage_requested = false;
            session.request.storage = None;
            Transition::compute()
        }
        (S::Quoted, Choice::NewQuote) => {
            session.reset(session.last_activity);
            Transition::to(S::MainMenu)
        }
        _ => return Err(InputError::UnexpectedChoice.into()),
    };
    Ok(transition)
}

fn step_text(session: &mut SessionState, text: &str) -> StepResult {
    use DialogState as S;

    let transition = match session.state {
        S::BoundaryDistance => {
            let km = parse_int(text, "distance beyond the boundary in km", bounds::BOUNDARY_DISTANCE_KM)?;
            session.request.boundary_distance_km = km;
            Transition::to(S::AddStop).notice(format!("Distance beyond the boundary: {km} km"))
        }
        S::RouteDistance { from, to } => {
            let km = parse_int(text, "route distance in km", bounds::ROUTE_DISTANCE_KM)?;
            session.request.extra_routes.push(ExtraRoute { from, to, distance_km: km });
            Transition::to(S::AddStop).notice(format!(
                "Route {} → {} added ({km} km)",
                from.short_label(),
                to.short_label()
            ))
        }
        S::DoorDistance => {
            let range = Decimal::from(*bounds::DOOR_DISTANCE_M.start())..=Decimal::from(*bounds::DOOR_DISTANCE_M.end());
            let meters = parse_decimal(text, "distance to the door in meters", range)?;
            session.request.door_distance_m = Some(meters);
            if meters > Decimal::from(bounds::DOOR_DISTANCE_CARRY_THRESHOLD_M) {
                Transition::to(S::CarryCount)
            } else {
                session.request.carry_count = 0;
                Transition::to(S::Volume)
            }
        }
        S::CarryCount => {
            session.request.carry_count = parse_int(text, "number of carries", bounds::CARRY_COUNT)?;
            Transition::to(S::Volume)
        }
        S::SharedFloor => {
            let floor = parse_int(text, "floor", bounds::FLOOR)?;
            session.shared_floor = Some(floor);
            Transition::to(S::SharedElevator).notice(format!("Floor {floor} will be used for all items"))
        }
        S::PlacesInput => {
            let places = parse_int(text, "number of places", bounds::PLACES)?;
            draft_mut(session)?.places_count = places;
            Transition::to(S::LiftingNeeded)
        }
        S::ItemFloor => {
            let floor = parse_int(text, "floor", bounds::FLOOR)?;
            draft_mut(session)?.floor = Some(floor);
            Transition::to(S::ItemElevator)
        }
        S::ElevatorPlaces => {
            let draft = draft_mut(session)?;
            let max = draft.places_count.saturating_sub(1).max(1);
            draft.elevator_places = parse_int(text, "number of places by elevator", 1..=max)?;
            Transition::to(S::StairsPlaces)
        }
        S::StairsPlaces => {
            let state = session.state.name();
            let draft = draft_mut(session)?;
            let expected = draft.places_count.saturating_sub(draft.elevator_places);
            let stairs: u32 = parse_int(text, "number of places by stairs", 0..=*bounds::PLACES.end())?;
            if stairs != expected {
                return Err(InputError::SplitMismatch { expected }.into());
            }
            let floor = draft.floor.ok_or(DialogError::MissingField { field: "floor", state })?;
            draft.lifting = Some(Lifting::mixed(floor, draft.elevator_places, stairs));
            after_lifting(session)?
        }
        S::DeclaredValue => {
            let value = parse_int(text, "furniture value", bounds::DECLARED_VALUE)?;
            draft_mut(session)?.declared_value = Some(value);
            finish_item(session)?
        }
        S::StorageDays => {
            let days = parse_int(text, "storage duration in days", bounds::STORAGE_DAYS)?;
            Transition::to(S::StorageVolume { days })
        }
        S::StorageVolume { days } => {
            let volume_m3 = parse_positive_decimal(
                text,
                "storage volume in m³",
                Decimal::from(bounds::STORAGE_VOLUME_M3_MAX),
            )?;
            session.request.storage = Some(StorageRequest { days, volume_m3 });
            Transition::compute()
        }
        _ => return Err(InputError::ButtonExpected.into()),
    };
    Ok(transition)
}

fn draft_mut(session: &mut SessionState) -> Result<&mut FurnitureDraft, DialogError> {
    let state = session.state.name();
    session.draft.as_mut().ok_or(DialogError::MissingDraft { state })
}

fn lift_decision(session: &mut SessionState, elevator: bool) -> StepResult {
    let state = session.state.name();
    let draft = draft_mut(session)?;
    let floor = draft.floor.ok_or(DialogError::MissingField { field: "floor", state })?;
    let places = draft.places_count;

    if !elevator {
        draft.lifting = Some(Lifting::by_stairs(floor, places));
    } else if places > 1 {
        return Ok(Transition::to(DialogState::SplitMethod));
    } else {
        draft.lifting = Some(Lifting::by_elevator(floor, places));
    }
    after_lifting(session)
}

fn after_lifting(session: &mut SessionState) -> StepResult {
    let draft = draft_mut(session)?;
    if draft.kind.assembly() == AssemblyPricing::None {
        draft.assembly_needed = false;
        return finish_item(session);
    }
    Ok(Transition::to(DialogState::Assembly))
}

fn finish_item(session: &mut SessionState) -> StepResult {
    let state = session.state.name();
    let draft = session.draft.take().ok_or(DialogError::MissingDraft { state })?;
    let name = draft.kind.display_name();
    session.request.furniture_items.push(draft.into_item());
    Ok(Transition::to(DialogState::AddAnotherItem).notice(format!("Added: {name}")))
}

fn back_target(session: &SessionState) -> Option<DialogState> {
    use DialogState as S;

    match session.state {
        S::AddressZone | S::ViewPrices => Some(S::MainMenu),
        S::AddStop | S::RouteFrom | S::RouteTo { .. } | S::CarryQuestion => Some(S::AddressZone),
        S::Volume => Some(S::CarryQuestion),
        S::DeliveryOnly => Some(S::Volume),
        S::FurnitureCategory => Some(S::DeliveryOnly),
        S::FurnitureKind { .. } => Some(S::FurnitureCategory),
        S::StorageQuestion => Some(S::Volume),
        S::StorageDays if session.request.storage_only => Some(S::MainMenu),
        _ => None,
    }
}

fn yes_no(prompt: Prompt, yes: &str, no: &str) -> Prompt {
    prompt.row(vec![Button::new(Choice::Yes, yes), Button::new(Choice::No, no)])
}

fn zone_row() -> Vec<Button> {
    vec![
        Button::new(Choice::Zone(Zone::Near), Zone::Near.short_label()),
        Button::new(Choice::Zone(Zone::Far), Zone::Far.short_label()),
    ]
}

fn with_back(prompt: Prompt, session: &SessionState) -> Prompt {
    if back_target(session).is_some() {
        prompt.button(Choice::Back, "⬅ Back")
    } else {
        prompt
    }
}

fn prompt_for(session: &SessionState, rates: &RateTable) -> Option<Prompt> {
    use DialogState as S;

    let request = &session.request;
    let far = request.is_far();
    let draft = session.draft.as_ref();
    let item_name = draft.map(|draft| draft.kind.display_name()).unwrap_or("this item");
    let places = draft.map(|draft| draft.places_count).unwrap_or(1);

    let prompt = match session.state {
        S::Ended => return None,
        S::MainMenu => {
            let mut prompt = Prompt::choices("What would you like to calculate?")
                .button(Choice::StartDelivery, "Delivery quote")
                .button(Choice::StartStorage, "Storage only");
            if session.is_admin {
                prompt = prompt.row(vec![
                    Button::new(Choice::ViewPrices, "View prices"),
                    Button::new(Choice::RefreshPrices, "Refresh prices"),
                ]);
            }
            prompt
        }
        S::AddressZone => Prompt::choices("Where is the delivery address?").row(vec![
            Button::new(Choice::Zone(Zone::Near), "Inside the boundary"),
            Button::new(Choice::Zone(Zone::Far), "Outside the boundary"),
        ]),
        S::BoundaryDistance => Prompt::question(format!(
            "How many km beyond the boundary? Enter a number from {} to {}.",
            bounds::BOUNDARY_DISTANCE_KM.start(),
            bounds::BOUNDARY_DISTANCE_KM.end()
        )),
        S::AddStop => {
            let text = match request.extra_routes.len() {
                0 => "Do you need an extra delivery stop?".to_owned(),
                count => format!("Extra stops so far: {count}. Add another one?"),
            };
            Prompt::choices(text).row(vec![
                Button::new(Choice::AddStop, "Add stop"),
                Button::new(Choice::FinishStops, "Finish"),
            ])
        }
        S::RouteFrom => Prompt::choices("Extra route: where does it start?").row(zone_row()),
        S::RouteTo { from } => {
            Prompt::choices(format!("Extra route from {}: where does it end?", from.short_label()))
                .row(zone_row())
        }
        S::RouteDistance { from, to } => Prompt::question(format!(
            "Distance of the route {} → {} in km ({} to {}):",
            from.short_label(),
            to.short_label(),
            bounds::ROUTE_DISTANCE_KM.start(),
            bounds::ROUTE_DISTANCE_KM.end()
        )),
        S::CarryQuestion => {
            if far {
                yes_no(Prompt::choices("Can the truck reach the house door?"), "Yes", "No")
            } else {
                yes_no(Prompt::choices("Is a carry from the parking or yard needed?"), "Yes", "No")
            }
        }
        S::DoorDistance => Prompt::question(format!(
            "How far is the door from where the truck stops, in meters ({} to {})?",
            bounds::DOOR_DISTANCE_M.start(),
            bounds::DOOR_DISTANCE_M.end()
        )),
        S::CarryCount => Prompt::question(format!(
            "How many carries from the parking are needed ({} to {})?",
            bounds::CARRY_COUNT.start(),
            bounds::CARRY_COUNT.end()
        )),
        S::Volume => VolumeClass::ALL.chunks(2).fold(Prompt::choices("What is the cargo volume?"), |prompt, pair| {
            prompt.row(pair.iter().map(|class| Button::new(Choice::Volume(*class), class.label())).collect())
        }),
        S::DeliveryOnly => {
            let text = if far {
                "Is delivery to the house door all you need?"
            } else {
                "Is delivery to the entrance all you need?"
            };
            Prompt::choices(text)
                .button(Choice::Yes, "Yes, delivery only")
                .button(Choice::No, "No, lifting or assembly is needed")
        }
        S::SharedFloor => Prompt::question(format!(
            "Which floor is the apartment on ({} to {})? It is used for every item.",
            bounds::FLOOR.start(),
            bounds::FLOOR.end()
        )),
        S::SharedElevator => yes_no(Prompt::choices("Is there an elevator in the building?"), "Yes", "No"),
        S::FurnitureCategory => FurnitureCategory::ALL.iter().fold(
            Prompt::choices("Choose a furniture category:"),
            |prompt, category| prompt.button(Choice::Category(*category), category.label()),
        ),
        S::FurnitureKind { category } => category.kinds().fold(
            Prompt::choices(format!("{}: choose the item", category.label())),
            |prompt, kind| prompt.button(Choice::Kind(kind), kind.display_name()),
        ),
        S::PlacesConfirm => {
            let mut text = format!("{item_name}: {places} place(s) by default.");
            if let Some(hint) = draft.and_then(|draft| rates.lifting(draft.kind)).and_then(|rate| rate.hint) {
                text.push('\n');
                text.push_str(&hint);
            }
            text.push_str("\nKeep this number?");
            Prompt::choices(text).row(vec![
                Button::new(Choice::KeepPlaces, format!("Keep {places}")),
                Button::new(Choice::ChangePlaces, "Change"),
            ])
        }
        S::PlacesInput => Prompt::question(format!(
            "How many places ({} to {})?",
            bounds::PLACES.start(),
            bounds::PLACES.end()
        )),
        S::LiftingNeeded => {
            yes_no(Prompt::choices(format!("Does {item_name} need lifting to the floor?")), "Yes", "No")
        }
        S::ItemFloor => Prompt::question(format!(
            "Which floor ({} to {})? Basement and ground levels are charged as the 2nd floor.",
            bounds::FLOOR.start(),
            bounds::FLOOR.end()
        )),
        S::ItemElevator => yes_no(Prompt::choices("Is there an elevator?"), "Yes", "No"),
        S::SplitMethod => Prompt::choices(format!("How should the {places} places go up?"))
            .button(Choice::AllByElevator, "All by elevator")
            .button(Choice::MixedLift, "Part by elevator, part by stairs"),
        S::ElevatorPlaces => Prompt::question(format!(
            "How many places go by elevator (1 to {})?",
            places.saturating_sub(1).max(1)
        )),
        S::StairsPlaces => {
            let remaining = draft.map(|draft| draft.places_count.saturating_sub(draft.elevator_places)).unwrap_or(0);
            Prompt::question(format!("How many places go by stairs? Remaining: {remaining}."))
        }
        S::Assembly => yes_no(Prompt::choices(format!("Is assembly needed for {item_name}?")), "Yes", "No"),
        S::DeclaredValue => Prompt::question(format!(
            "What is the value of {item_name} ({} to {})? Assembly is charged as a percent of it.",
            bounds::DECLARED_VALUE.start(),
            bounds::DECLARED_VALUE.end()
        )),
        S::AddAnotherItem => yes_no(
            Prompt::choices(format!("Items so far: {}. Add another item?", request.furniture_items.len())),
            "Add another",
            "Finish",
        ),
        S::StorageQuestion => yes_no(Prompt::choices("Is warehouse storage needed?"), "Yes", "No"),
        S::StorageDays => Prompt::question(format!(
            "How many days of storage ({} to {})?",
            bounds::STORAGE_DAYS.start(),
            bounds::STORAGE_DAYS.end()
        )),
        S::StorageVolume { days } => Prompt::question(format!(
            "Storage for {days} days. What volume in m³ (more than 0, up to {})?",
            bounds::STORAGE_VOLUME_M3_MAX
        )),
        S::Quoted => Prompt::choices("Need another quote?").button(Choice::NewQuote, "New quote"),
        S::ViewPrices => Prompt::choices("Current prices are listed above."),
    };

    Some(with_back(prompt, session))
}
