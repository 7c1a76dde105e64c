//! `bunker` - CLI for bunkerdesk
//!
//! This binary provides the command-line interface for the sales desk:
//! contacts, suppliers, activity logging, goals, call blocks and dashboards.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context as _};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use clap::Parser;
use tracing::debug;

use bunkerdesk::chart::communications_chart;
use bunkerdesk::cli::output;
use bunkerdesk::cli::{
    Breakdown, CallCommand, ChartCommand, Cli, Command, ConfigCommand, ContactCommand,
    ContactFields, DealArgs, DealCommand, EmailCommand, GoalCommand, NoteCommand, OutputFormat,
    PrefsCommand, ScheduleCommand, StatsCommand, SupplierCommand, TaskCommand,
};
use bunkerdesk::clocks::{parse_local_datetime, parse_timezone, world_clocks};
use bunkerdesk::digest::Digest;
use bunkerdesk::model::{
    parse_list, Call, CallSchedule, Contact, ContactStatus, DailyGoal, Email, EmailDirection,
    FuelDeal, GoalType, SavedNote, SharePermission, StatusFlag, Supplier, SupplierPort, Task,
    UserPreferences,
};
use bunkerdesk::progress::progress_for_date;
use bunkerdesk::schedule::{self, Grid};
use bunkerdesk::{sharing, stats};
use bunkerdesk::{init_logging, ChangeFeed, Config, ContactFilter, Storage};

/// Everything a command handler needs.
#[derive(Debug)]
struct Desk {
    config: Config,
    storage: Storage,
    prefs: UserPreferences,
    actor: String,
    tz: Tz,
    format: OutputFormat,
    now: DateTime<Utc>,
}

impl Desk {
    fn today(&self) -> NaiveDate {
        self.now.with_timezone(&self.tz).date_naive()
    }

    fn at_or_now(&self, at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
        match at {
            Some(input) => Ok(parse_local_datetime(input, self.tz)?),
            None => Ok(self.now),
        }
    }

    fn grid(&self, start: Option<NaiveTime>, minutes: Option<u32>) -> anyhow::Result<Grid> {
        let start = match start {
            Some(start) => start,
            None => self.config.workday_start()?,
        };
        Ok(Grid::new(
            start,
            minutes.unwrap_or(self.config.schedule.slot_minutes),
        ))
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let mut config = Config::load_from(cli.config.clone())?;
    config.validate()?;

    // Config commands work without a database
    let command = match cli.command {
        Command::Config(cmd) => return handle_config(&config, cmd, cli.format),
        other => other,
    };

    let feed = ChangeFeed::default();
    let mut changes = feed.subscribe();
    let storage = Storage::open(config.database_path())
        .with_context(|| format!("opening {}", config.database_path().display()))?
        .with_feed(feed);

    let actor = cli.as_user.clone().unwrap_or_else(|| config.user.name.clone());
    let prefs = match storage.get_preferences(&actor)? {
        Some(prefs) => {
            prefs.apply_to(&mut config);
            prefs
        }
        None => UserPreferences {
            user: actor.clone(),
            ..UserPreferences::from_config(&config)
        },
    };
    let tz = config.home_timezone()?;

    let desk = Desk {
        config,
        storage,
        prefs,
        actor,
        tz,
        format: cli.format,
        now: Utc::now(),
    };

    match command {
        Command::Contact(cmd) => handle_contact(&desk, cmd)?,
        Command::Supplier(cmd) => handle_supplier(&desk, cmd)?,
        Command::Call(cmd) => handle_call(&desk, cmd)?,
        Command::Email(cmd) => handle_email(&desk, cmd)?,
        Command::Deal(cmd) => handle_deal(&desk, cmd)?,
        Command::Goal(cmd) => handle_goal(&desk, cmd)?,
        Command::Schedule(cmd) => handle_schedule(&desk, cmd)?,
        Command::Task(cmd) => handle_task(&desk, cmd)?,
        Command::Note(cmd) => handle_note(&desk, cmd)?,
        Command::Chart(cmd) => handle_chart(&desk, &cmd)?,
        Command::Stats(cmd) => handle_stats(&desk, &cmd)?,
        Command::Clock => handle_clock(&desk)?,
        Command::Digest => handle_digest(&desk)?,
        Command::Status => handle_status(&desk)?,
        Command::Prefs(cmd) => handle_prefs(&desk, cmd)?,
        Command::Config(cmd) => handle_config(&desk.config, cmd, desk.format)?,
    }

    while let Ok(event) = changes.try_recv() {
        debug!("committed {} {} {}", event.op, event.table, event.id);
    }
    Ok(())
}

fn apply_fields(contact: &mut Contact, fields: ContactFields) -> anyhow::Result<()> {
    let ContactFields {
        company,
        email,
        phone,
        role,
        region,
        priority,
        status,
        notes,
    } = fields;
    if company.is_some() {
        contact.company = company;
    }
    if email.is_some() {
        contact.email = email;
    }
    if phone.is_some() {
        contact.phone = phone;
    }
    if role.is_some() {
        contact.role = role;
    }
    if region.is_some() {
        contact.region = region;
    }
    if let Some(priority) = priority {
        contact.priority = priority;
    }
    if let Some(status) = status {
        contact.status = ContactStatus::from_flags(&parse_list(&status)?);
    }
    if notes.is_some() {
        contact.notes = notes;
    }
    Ok(())
}

fn require_contact(desk: &Desk, id: i64) -> anyhow::Result<Contact> {
    Ok(desk.storage.require_contact(id)?)
}

fn handle_contact(desk: &Desk, cmd: ContactCommand) -> anyhow::Result<()> {
    match cmd {
        ContactCommand::Add { name, fields } => {
            let mut contact = Contact::new(name);
            apply_fields(&mut contact, fields)?;
            let id = desk.storage.insert_contact(&contact)?;
            println!("Added contact #{id}: {}", contact.display_name());
        }
        ContactCommand::List {
            status,
            min_priority,
            all,
            limit,
        } => {
            let filter = ContactFilter {
                status,
                min_priority,
                include_dead: all || status == Some(StatusFlag::Dead),
                limit,
            };
            let contacts = desk.storage.list_contacts(&filter)?;
            println!("{}", output::contacts(desk.format, &contacts)?);
        }
        ContactCommand::Show { id } => {
            let contact = require_contact(desk, id)?;
            if desk.format == OutputFormat::Json {
                println!("{}", output::json(&contact)?);
            } else {
                println!("{}", output::contact_detail(&contact, desk.tz));
                let calls = desk.storage.list_calls(Some(id), 5)?;
                if !calls.is_empty() {
                    println!();
                    println!("Recent calls");
                    println!("{}", output::calls(desk.format, &calls, desk.tz)?);
                }
            }
        }
        ContactCommand::Search { query, limit } => {
            let contacts = desk.storage.search_contacts(&query, limit)?;
            println!("{}", output::contacts(desk.format, &contacts)?);
        }
        ContactCommand::Update { id, name, fields } => {
            let mut contact = require_contact(desk, id)?;
            if let Some(name) = name {
                contact.name = name;
            }
            apply_fields(&mut contact, fields)?;
            desk.storage.update_contact(&contact)?;
            println!("Updated contact #{id}");
        }
        ContactCommand::Delete { id } => {
            if desk.storage.delete_contact(id)? {
                println!("Deleted contact #{id}");
            } else {
                bail!("contact {id} not found");
            }
        }
    }
    Ok(())
}

fn handle_supplier(desk: &Desk, cmd: SupplierCommand) -> anyhow::Result<()> {
    let port_row = |p: &SupplierPort| {
        let fuels: Vec<&str> = p.fuels.iter().map(|f| f.as_str()).collect();
        let delivery: Vec<&str> = p.delivery.iter().map(|d| d.as_str()).collect();
        vec![
            p.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
            p.port.clone(),
            p.country.clone().unwrap_or_default(),
            fuels.join(","),
            delivery.join(","),
        ]
    };

    match cmd {
        SupplierCommand::Add {
            name,
            email,
            phone,
            notes,
        } => {
            let mut supplier = Supplier::new(name);
            supplier.email = email;
            supplier.phone = phone;
            supplier.notes = notes;
            let id = desk.storage.insert_supplier(&supplier)?;
            println!("Added supplier #{id}: {}", supplier.name);
        }
        SupplierCommand::List => {
            let suppliers = desk.storage.list_suppliers()?;
            let listing = output::listing(
                desk.format,
                &suppliers,
                "No suppliers.",
                &["ID", "NAME", "EMAIL", "PHONE"],
                |s| {
                    vec![
                        s.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                        s.name.clone(),
                        s.email.clone().unwrap_or_default(),
                        s.phone.clone().unwrap_or_default(),
                    ]
                },
            )?;
            println!("{listing}");
        }
        SupplierCommand::Show { id } => {
            let supplier = desk
                .storage
                .get_supplier(id)?
                .with_context(|| format!("supplier {id} not found"))?;
            let ports = desk.storage.supplier_ports(id)?;
            if desk.format == OutputFormat::Json {
                println!(
                    "{}",
                    output::json(&serde_json::json!({ "supplier": supplier, "ports": ports }))?
                );
            } else {
                println!("{} (#{id})", supplier.name);
                let listing = output::listing(
                    desk.format,
                    &ports,
                    "No ports.",
                    &["ID", "PORT", "COUNTRY", "FUELS", "DELIVERY"],
                    port_row,
                )?;
                println!("{listing}");
            }
        }
        SupplierCommand::AddPort {
            supplier,
            port,
            country,
            fuels,
            delivery,
            notes,
        } => {
            let mut entry = SupplierPort::new(supplier, port);
            entry.country = country;
            entry.fuels = fuels;
            entry.delivery = delivery;
            entry.notes = notes;
            let id = desk.storage.add_supplier_port(&entry)?;
            println!("Added port #{id}: {}", entry.port);
        }
        SupplierCommand::RemovePort { id } => {
            if !desk.storage.delete_supplier_port(id)? {
                bail!("supplier port {id} not found");
            }
            println!("Removed port #{id}");
        }
        SupplierCommand::Find { port, fuel } => {
            let found = desk.storage.find_ports(&port, fuel)?;
            let listing = output::listing(
                desk.format,
                &found,
                "No supplier covers that port.",
                &["SUPPLIER", "ID", "PORT", "COUNTRY", "FUELS", "DELIVERY"],
                |(supplier, p)| {
                    let mut row = vec![supplier.name.clone()];
                    row.extend(port_row(p));
                    row
                },
            )?;
            println!("{listing}");
        }
        SupplierCommand::Delete { id } => {
            if !desk.storage.delete_supplier(id)? {
                bail!("supplier {id} not found");
            }
            println!("Deleted supplier #{id}");
        }
    }
    Ok(())
}

fn handle_call(desk: &Desk, cmd: CallCommand) -> anyhow::Result<()> {
    match cmd {
        CallCommand::Log {
            contact,
            outcome,
            duration,
            at,
            notes,
        } => {
            let mut call = Call::new(contact, outcome);
            call.called_at = desk.at_or_now(at.as_deref())?;
            call.duration_minutes = duration;
            call.notes = notes;
            let id = desk.storage.log_call(&call)?;
            println!("Logged call #{id} ({outcome})");
        }
        CallCommand::List { contact, limit } => {
            let calls = desk.storage.list_calls(contact, limit)?;
            println!("{}", output::calls(desk.format, &calls, desk.tz)?);
        }
        CallCommand::Delete { id } => {
            if !desk.storage.delete_call(id)? {
                bail!("call {id} not found");
            }
            println!("Deleted call #{id}");
        }
    }
    Ok(())
}

fn handle_email(desk: &Desk, cmd: EmailCommand) -> anyhow::Result<()> {
    match cmd {
        EmailCommand::Log {
            contact,
            subject,
            received,
            body,
            at,
        } => {
            let mut email = Email::sent(contact, subject);
            if received {
                email.direction = EmailDirection::Received;
            }
            email.body = body;
            email.sent_at = desk.at_or_now(at.as_deref())?;
            let id = desk.storage.log_email(&email)?;
            println!("Logged email #{id} ({})", email.direction);
        }
        EmailCommand::List { contact, limit } => {
            let emails = desk.storage.list_emails(contact, limit)?;
            println!("{}", output::emails(desk.format, &emails, desk.tz)?);
        }
        EmailCommand::Delete { id } => {
            if !desk.storage.delete_email(id)? {
                bail!("email {id} not found");
            }
            println!("Deleted email #{id}");
        }
    }
    Ok(())
}

fn handle_deal(desk: &Desk, cmd: DealCommand) -> anyhow::Result<()> {
    match cmd {
        DealCommand::Add(DealArgs {
            contact,
            vessel,
            imo,
            port,
            fuel,
            quantity,
            price,
            buy_price,
            supplier,
            delivery,
        }) => {
            let mut deal = FuelDeal::quote(contact, vessel, port, fuel, quantity, price);
            deal.imo = imo;
            deal.buy_price_usd = buy_price;
            deal.supplier_id = supplier;
            deal.delivery_date = delivery;
            let id = desk.storage.insert_deal(&deal)?;
            println!(
                "Quoted deal #{id}: {:.0} mt {} at {} for {}",
                deal.quantity_mt,
                deal.fuel_type.as_str().to_uppercase(),
                deal.port,
                deal.vessel_name
            );
        }
        DealCommand::List { status, limit } => {
            let deals = desk.storage.list_deals(status, limit)?;
            println!("{}", output::deals(desk.format, &deals)?);
        }
        DealCommand::Show { id } => {
            let deal = desk
                .storage
                .get_deal(id)?
                .with_context(|| format!("deal {id} not found"))?;
            if desk.format == OutputFormat::Json {
                println!("{}", output::json(&deal)?);
            } else {
                println!("{}", output::deals(OutputFormat::Table, std::slice::from_ref(&deal))?);
                if let Some(imo) = &deal.imo {
                    println!("IMO {imo}");
                }
                if let Some(date) = deal.delivery_date {
                    println!("Delivery {date}");
                }
                println!("Value {:.2} USD", deal.value());
            }
        }
        DealCommand::Status { id, status } => {
            desk.storage.set_deal_status(id, status)?;
            println!("Deal #{id} is now {status}");
        }
        DealCommand::Delete { id } => {
            if !desk.storage.delete_deal(id)? {
                bail!("deal {id} not found");
            }
            println!("Deleted deal #{id}");
        }
    }
    Ok(())
}

fn set_goal(
    desk: &Desk,
    date: NaiveDate,
    goal_type: GoalType,
    target: Option<u32>,
    deadline: Option<NaiveTime>,
) -> anyhow::Result<i64> {
    let target = target.unwrap_or_else(|| desk.config.goals.target(goal_type));
    let deadline = match deadline {
        Some(deadline) => deadline,
        None => desk.config.default_deadline()?,
    };
    let goal = DailyGoal::new(date, goal_type, target, deadline);
    Ok(desk.storage.upsert_goal(&goal)?)
}

fn handle_goal(desk: &Desk, cmd: GoalCommand) -> anyhow::Result<()> {
    match cmd {
        GoalCommand::Set {
            goal_type,
            target,
            date,
            deadline,
        } => {
            let date = date.unwrap_or_else(|| desk.today());
            let id = set_goal(desk, date, goal_type, target, deadline)?;
            println!("Goal #{id}: {goal_type} on {date}");
        }
        GoalCommand::Defaults { date } => {
            let date = date.unwrap_or_else(|| desk.today());
            for goal_type in GoalType::ALL {
                set_goal(desk, date, *goal_type, None, None)?;
            }
            println!("Default goals set for {date}");
        }
        GoalCommand::Progress { date } => {
            let date = date.unwrap_or_else(|| desk.today());
            let progress = progress_for_date(&desk.storage, date, &desk.config, desk.now)?;
            println!("{}", output::progress(desk.format, &progress)?);
        }
        GoalCommand::Clear { id } => {
            if !desk.storage.delete_goal(id)? {
                bail!("goal {id} not found");
            }
            println!("Cleared goal #{id}");
        }
    }
    Ok(())
}

fn load_schedule(desk: &Desk, id: i64) -> anyhow::Result<CallSchedule> {
    desk.storage
        .get_schedule(id)?
        .with_context(|| format!("call schedule {id} not found"))
}

fn print_schedule(desk: &Desk, schedule: &CallSchedule) -> anyhow::Result<()> {
    let names = |contact_id: i64| match desk.storage.get_contact(contact_id) {
        Ok(Some(contact)) => contact.display_name(),
        _ => format!("#{contact_id}"),
    };
    println!("{}", output::schedule(desk.format, schedule, &names)?);
    Ok(())
}

/// Grid that continues an existing block from its first slot.
fn grid_for(desk: &Desk, schedule: &CallSchedule) -> anyhow::Result<Grid> {
    desk.grid(schedule.slots.first().map(|slot| slot.time), None)
}

fn handle_schedule(desk: &Desk, cmd: ScheduleCommand) -> anyhow::Result<()> {
    match cmd {
        ScheduleCommand::Create {
            title,
            date,
            start,
            count,
            link_goal,
        } => {
            let date = date.unwrap_or_else(|| desk.today());
            let grid = desk.grid(start, None)?;
            let contacts = desk.storage.list_contacts(&ContactFilter::default())?;
            let count = count.unwrap_or(desk.config.schedule.default_slots);

            let mut schedule = CallSchedule::new(date, title);
            schedule.slots = schedule::generate(&contacts, &grid, count)?;
            if link_goal {
                schedule.goal_id = desk
                    .storage
                    .goals_for_date(date)?
                    .into_iter()
                    .find(|goal| goal.goal_type == GoalType::Calls)
                    .and_then(|goal| goal.id);
                if schedule.goal_id.is_none() {
                    bail!("no calls goal set for {date}");
                }
            }
            let id = desk.storage.create_schedule(&schedule)?;
            schedule.id = Some(id);
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Show { id } => {
            print_schedule(desk, &load_schedule(desk, id)?)?;
        }
        ScheduleCommand::List { date } => {
            let date = date.unwrap_or_else(|| desk.today());
            let schedules = desk.storage.schedules_for_date(date)?;
            let listing = output::listing(
                desk.format,
                &schedules,
                "No call blocks.",
                &["ID", "TITLE", "DATE", "SLOTS", "DONE"],
                |s| {
                    vec![
                        s.id.map_or_else(|| "-".to_string(), |id| id.to_string()),
                        s.title.clone(),
                        s.date.to_string(),
                        s.slots.len().to_string(),
                        s.completed_count().to_string(),
                    ]
                },
            )?;
            println!("{listing}");
        }
        ScheduleCommand::Insert { id, contact, at } => {
            let mut schedule = load_schedule(desk, id)?;
            require_contact(desk, contact)?;
            let grid = grid_for(desk, &schedule)?;
            let index = at.unwrap_or(schedule.slots.len());
            schedule::insert_at(&mut schedule.slots, index, contact, &grid)?;
            desk.storage.save_slots(id, &schedule.slots)?;
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Move { id, from, to } => {
            let mut schedule = load_schedule(desk, id)?;
            schedule::move_slot(&mut schedule.slots, from, to)?;
            desk.storage.save_slots(id, &schedule.slots)?;
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Nudge { id, position, down } => {
            let mut schedule = load_schedule(desk, id)?;
            schedule::swap_adjacent(&mut schedule.slots, position, !down)?;
            desk.storage.save_slots(id, &schedule.slots)?;
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Remove { id, position } => {
            let mut schedule = load_schedule(desk, id)?;
            let removed = schedule::remove_at(&mut schedule.slots, position)?;
            desk.storage.save_slots(id, &schedule.slots)?;
            debug!("removed contact {} from schedule {id}", removed.contact_id);
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Retime { id, start, minutes } => {
            let mut schedule = load_schedule(desk, id)?;
            let grid = desk.grid(Some(start), minutes)?;
            schedule::retime(&mut schedule.slots, &grid)?;
            desk.storage.save_slots(id, &schedule.slots)?;
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Done {
            id,
            position,
            outcome,
            undo,
        } => {
            let mut schedule = load_schedule(desk, id)?;
            let Some(slot) = schedule.slots.get_mut(position) else {
                bail!("schedule {id} has no slot {position}");
            };
            desk.storage.set_slot_completed(id, slot.position, !undo)?;
            slot.completed = !undo;
            if !undo {
                let call = Call::new(slot.contact_id, outcome);
                let call_id = desk.storage.log_call(&call)?;
                debug!("logged call {call_id} for slot {position}");
            }
            print_schedule(desk, &schedule)?;
        }
        ScheduleCommand::Delete { id } => {
            if !desk.storage.delete_schedule(id)? {
                bail!("call schedule {id} not found");
            }
            println!("Deleted call schedule #{id}");
        }
    }
    Ok(())
}

fn handle_task(desk: &Desk, cmd: TaskCommand) -> anyhow::Result<()> {
    match cmd {
        TaskCommand::Add {
            title,
            kind,
            due,
            contact,
            supplier,
            notes,
        } => {
            let mut task = Task::new(title, kind);
            task.due_at = due
                .as_deref()
                .map(|due| parse_local_datetime(due, desk.tz))
                .transpose()?;
            task.contact_id = contact;
            task.supplier_id = supplier;
            task.notes = notes;
            let id = desk.storage.insert_task(&task)?;
            println!("Added task #{id}: {}", task.title);
        }
        TaskCommand::List => {
            let tasks = desk.storage.open_tasks()?;
            println!("{}", output::tasks(desk.format, &tasks, desk.tz, desk.now)?);
        }
        TaskCommand::Done { id } => {
            desk.storage.complete_task(id, desk.now)?;
            println!("Completed task #{id}");
        }
        TaskCommand::Reopen { id } => {
            desk.storage.reopen_task(id)?;
            println!("Reopened task #{id}");
        }
        TaskCommand::Delete { id } => {
            if !desk.storage.delete_task(id)? {
                bail!("task {id} not found");
            }
            println!("Deleted task #{id}");
        }
    }
    Ok(())
}

fn handle_note(desk: &Desk, cmd: NoteCommand) -> anyhow::Result<()> {
    let actor = desk.actor.as_str();
    match cmd {
        NoteCommand::Add {
            title,
            content,
            contact,
        } => {
            let mut note = SavedNote::new(actor, title, content);
            note.contact_id = contact;
            match desk.storage.insert_note(&note)? {
                Some(id) => println!("Saved note #{id}"),
                None => println!("An identical note is already saved."),
            }
        }
        NoteCommand::List => {
            let notes = sharing::visible_notes(&desk.storage, actor)?;
            println!("{}", output::notes(desk.format, &notes)?);
        }
        NoteCommand::Show { id } => {
            let visible = sharing::read_note(&desk.storage, id, actor)?;
            if desk.format == OutputFormat::Json {
                println!("{}", output::json(&visible)?);
            } else {
                println!("{} (#{id}, {})", visible.note.title, visible.access);
                println!("by {}", visible.note.owner);
                println!();
                println!("{}", visible.note.content);
            }
        }
        NoteCommand::Edit { id, content, title } => {
            sharing::edit_note(&desk.storage, id, actor, title.as_deref(), &content)?;
            println!("Updated note #{id}");
        }
        NoteCommand::Share { id, user, edit } => {
            let permission = if edit {
                SharePermission::Edit
            } else {
                SharePermission::Read
            };
            sharing::share_note(&desk.storage, id, actor, &user, permission)?;
            println!("Shared note #{id} with {user} ({permission})");
        }
        NoteCommand::Unshare { id, user } => {
            if sharing::unshare_note(&desk.storage, id, actor, &user)? {
                println!("Note #{id} is no longer shared with {user}");
            } else {
                println!("Note #{id} was not shared with {user}");
            }
        }
        NoteCommand::Delete { id } => {
            sharing::delete_note(&desk.storage, id, actor)?;
            println!("Deleted note #{id}");
        }
    }
    Ok(())
}

fn handle_chart(desk: &Desk, cmd: &ChartCommand) -> anyhow::Result<()> {
    let period = cmd.period.unwrap_or(desk.prefs.chart_period);
    let anchor = cmd.date.unwrap_or_else(|| desk.today());
    let buckets = communications_chart(&desk.storage, period, anchor, desk.tz)?;
    if desk.format != OutputFormat::Json {
        println!("Communications, {period} of {anchor}");
    }
    println!("{}", output::chart(desk.format, &buckets)?);
    Ok(())
}

fn handle_stats(desk: &Desk, cmd: &StatsCommand) -> anyhow::Result<()> {
    let since = desk.now - chrono::Duration::days(i64::from(cmd.days));
    let wanted = match cmd.breakdown {
        Some(breakdown) => vec![breakdown],
        None => vec![Breakdown::Status, Breakdown::Outcomes, Breakdown::Fuel],
    };

    for (i, breakdown) in wanted.into_iter().enumerate() {
        if i > 0 {
            println!();
        }
        let (title, slices) = match breakdown {
            Breakdown::Status => {
                let filter = ContactFilter {
                    include_dead: true,
                    ..ContactFilter::default()
                };
                let contacts = desk.storage.list_contacts(&filter)?;
                ("Contacts by status".to_string(), stats::status_breakdown(&contacts))
            }
            Breakdown::Outcomes => {
                let calls = desk.storage.calls_between(since, desk.now)?;
                (
                    format!("Call outcomes, last {} days", cmd.days),
                    stats::call_outcome_breakdown(&calls),
                )
            }
            Breakdown::Fuel => {
                let deals = desk.storage.deals_between(since, desk.now)?;
                (
                    format!("Volume by grade (mt), last {} days", cmd.days),
                    stats::fuel_volume_breakdown(&deals),
                )
            }
        };
        println!("{}", output::pie(desk.format, &title, &slices)?);
    }
    Ok(())
}

fn handle_clock(desk: &Desk) -> anyhow::Result<()> {
    let readings = world_clocks(&desk.config.clocks.entries, desk.now)?;
    println!("{}", output::clocks(desk.format, &readings)?);
    Ok(())
}

fn handle_digest(desk: &Desk) -> anyhow::Result<()> {
    let tasks = desk.storage.open_tasks()?;
    let goals = progress_for_date(&desk.storage, desk.today(), &desk.config, desk.now)?;
    let digest = Digest::compose(
        &tasks,
        &goals,
        desk.now,
        desk.tz,
        desk.config.reminders.lookahead_days,
    );
    if desk.format == OutputFormat::Json {
        println!("{}", output::json(&digest)?);
    } else {
        println!("{}", digest.render_text(desk.tz));
    }
    Ok(())
}

fn handle_status(desk: &Desk) -> anyhow::Result<()> {
    let stats = desk.storage.stats()?;
    if desk.format == OutputFormat::Json {
        let status = serde_json::json!({
            "database_path": desk.storage.path(),
            "user": desk.actor,
            "home_timezone": desk.config.user.home_timezone,
            "stats": stats,
        });
        println!("{}", output::json(&status)?);
    } else {
        println!("bunker status");
        println!("-------------");
        println!("Database:      {}", desk.storage.path().display());
        println!("User:          {}", desk.actor);
        println!("Timezone:      {}", desk.config.user.home_timezone);
        println!();
        println!("Contacts:      {}", stats.contacts);
        println!("Suppliers:     {}", stats.suppliers);
        println!("Calls:         {}", stats.calls);
        println!("Emails:        {}", stats.emails);
        println!("Deals:         {}", stats.fuel_deals);
        println!("Open tasks:    {}", stats.open_tasks);
        println!("Notes:         {}", stats.saved_notes);
        println!("Call blocks:   {}", stats.call_schedules);
        println!("Size:          {} KiB", stats.db_size_bytes / 1024);
    }
    Ok(())
}

fn handle_prefs(desk: &Desk, cmd: PrefsCommand) -> anyhow::Result<()> {
    match cmd {
        PrefsCommand::Show => {
            let prefs = &desk.prefs;
            if desk.format == OutputFormat::Json {
                println!("{}", output::json(prefs)?);
            } else {
                println!("Preferences for {}", prefs.user);
                println!("  Home timezone:  {}", prefs.home_timezone);
                println!("  Chart period:   {}", prefs.chart_period);
                println!(
                    "  Goal targets:   {} calls, {} emails, {} deals",
                    prefs.goal_targets.calls, prefs.goal_targets.emails, prefs.goal_targets.deals
                );
                let clocks: Vec<&str> = prefs.clocks.iter().map(|c| c.label.as_str()).collect();
                println!("  Clocks:         {}", clocks.join(", "));
            }
        }
        PrefsCommand::Set {
            chart_period,
            home_timezone,
        } => {
            let mut prefs = desk.prefs.clone();
            if let Some(period) = chart_period {
                prefs.chart_period = period;
            }
            if let Some(name) = home_timezone {
                parse_timezone(&name)?;
                prefs.home_timezone = name;
            }
            desk.storage.put_preferences(&prefs)?;
            println!("Saved preferences for {}", prefs.user);
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand, format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show => {
            if format == OutputFormat::Json {
                println!("{}", output::json(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:    {}", config.database_path().display());
                println!();
                println!("[User]");
                println!("  Name:             {}", config.user.name);
                println!("  Home timezone:    {}", config.user.home_timezone);
                println!();
                println!("[Workday]");
                println!("  Start:            {}", config.workday.start);
                println!("  Goal deadline:    {}", config.workday.deadline);
                println!();
                println!("[Goals]");
                println!("  Calls:            {}", config.goals.calls);
                println!("  Emails:           {}", config.goals.emails);
                println!("  Deals:            {}", config.goals.deals);
                println!();
                println!("[Schedule]");
                println!("  Slot minutes:     {}", config.schedule.slot_minutes);
                println!("  Default slots:    {}", config.schedule.default_slots);
                println!();
                println!("[Clocks]");
                for clock in &config.clocks.entries {
                    println!("  {:<18}{}", clock.label, clock.timezone);
                }
                println!();
                println!("[Reminders]");
                println!("  Lookahead days:   {}", config.reminders.lookahead_days);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)).and_then(|config| config.validate()) {
                Ok(()) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
