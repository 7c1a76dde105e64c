//! `SQLite` schema definitions for bunkerdesk.
//!
//! These statements create the version 1 schema. Later versions are applied
//! by the migrations module.

/// Contacts with relationship flags and priority.
pub const CREATE_CONTACTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    company TEXT,
    email TEXT,
    phone TEXT,
    role TEXT,
    region TEXT,
    is_client INTEGER NOT NULL DEFAULT 0,
    is_traction INTEGER NOT NULL DEFAULT 0,
    is_jammed INTEGER NOT NULL DEFAULT 0,
    is_dead INTEGER NOT NULL DEFAULT 0,
    priority INTEGER NOT NULL DEFAULT 0 CHECK (priority BETWEEN 0 AND 5),
    notes TEXT,
    last_contacted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Fuel suppliers.
pub const CREATE_SUPPLIERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS suppliers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    notes TEXT,
    created_at TEXT NOT NULL
)
";

/// Ports served by a supplier. Capability lists are JSON arrays.
pub const CREATE_SUPPLIER_PORTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS supplier_ports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    supplier_id INTEGER NOT NULL REFERENCES suppliers(id) ON DELETE CASCADE,
    port TEXT NOT NULL,
    country TEXT,
    delivery TEXT NOT NULL DEFAULT '[]',
    fuels TEXT NOT NULL DEFAULT '[]',
    notes TEXT
)
";

/// Logged calls.
pub const CREATE_CALLS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS calls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    called_at TEXT NOT NULL,
    duration_minutes INTEGER NOT NULL DEFAULT 0,
    outcome TEXT NOT NULL,
    notes TEXT
)
";

/// Logged emails.
pub const CREATE_EMAILS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS emails (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    sent_at TEXT NOT NULL,
    direction TEXT NOT NULL,
    subject TEXT NOT NULL,
    body TEXT
)
";

/// Fuel deals.
pub const CREATE_FUEL_DEALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS fuel_deals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    supplier_id INTEGER REFERENCES suppliers(id) ON DELETE SET NULL,
    vessel_name TEXT NOT NULL,
    imo TEXT,
    port TEXT NOT NULL,
    fuel_type TEXT NOT NULL,
    quantity_mt REAL NOT NULL,
    sell_price_usd REAL NOT NULL,
    buy_price_usd REAL,
    delivery_date TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// Daily goals, one per date and type.
pub const CREATE_DAILY_GOALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS daily_goals (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    goal_date TEXT NOT NULL,
    goal_type TEXT NOT NULL,
    target INTEGER NOT NULL,
    deadline TEXT NOT NULL,
    UNIQUE (goal_date, goal_type)
)
";

/// Call schedules.
pub const CREATE_CALL_SCHEDULES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS call_schedules (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    goal_id INTEGER REFERENCES daily_goals(id) ON DELETE SET NULL,
    schedule_date TEXT NOT NULL,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// Slots of a call schedule.
pub const CREATE_SCHEDULE_SLOTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS schedule_slots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    schedule_id INTEGER NOT NULL REFERENCES call_schedules(id) ON DELETE CASCADE,
    contact_id INTEGER NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    slot_time TEXT NOT NULL,
    completed INTEGER NOT NULL DEFAULT 0
)
";

/// Follow-up tasks.
pub const CREATE_TASKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    due_at TEXT,
    contact_id INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
    supplier_id INTEGER REFERENCES suppliers(id) ON DELETE SET NULL,
    completed_at TEXT,
    notes TEXT,
    created_at TEXT NOT NULL
)
";

/// Saved notes.
pub const CREATE_SAVED_NOTES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS saved_notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner TEXT NOT NULL,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    contact_id INTEGER REFERENCES contacts(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Note shares, one per note and user.
pub const CREATE_NOTE_SHARES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS note_shares (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    note_id INTEGER NOT NULL REFERENCES saved_notes(id) ON DELETE CASCADE,
    shared_with TEXT NOT NULL,
    permission TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (note_id, shared_with)
)
";

/// Indexes for the common lookups.
pub const CREATE_INDEXES: &str = r"
CREATE INDEX IF NOT EXISTS idx_calls_contact ON calls(contact_id);
CREATE INDEX IF NOT EXISTS idx_calls_called_at ON calls(called_at);
CREATE INDEX IF NOT EXISTS idx_emails_contact ON emails(contact_id);
CREATE INDEX IF NOT EXISTS idx_emails_sent_at ON emails(sent_at);
CREATE INDEX IF NOT EXISTS idx_fuel_deals_created_at ON fuel_deals(created_at);
CREATE INDEX IF NOT EXISTS idx_schedule_slots_schedule ON schedule_slots(schedule_id, position);
CREATE INDEX IF NOT EXISTS idx_tasks_due_at ON tasks(due_at);
CREATE INDEX IF NOT EXISTS idx_saved_notes_owner ON saved_notes(owner);
CREATE INDEX IF NOT EXISTS idx_note_shares_user ON note_shares(shared_with)
";

/// Key-value metadata, including the schema version.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All version 1 statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_CONTACTS_TABLE,
    CREATE_SUPPLIERS_TABLE,
    CREATE_SUPPLIER_PORTS_TABLE,
    CREATE_CALLS_TABLE,
    CREATE_EMAILS_TABLE,
    CREATE_FUEL_DEALS_TABLE,
    CREATE_DAILY_GOALS_TABLE,
    CREATE_CALL_SCHEDULES_TABLE,
    CREATE_SCHEDULE_SLOTS_TABLE,
    CREATE_TASKS_TABLE,
    CREATE_SAVED_NOTES_TABLE,
    CREATE_NOTE_SHARES_TABLE,
    CREATE_INDEXES,
    CREATE_METADATA_TABLE,
];
