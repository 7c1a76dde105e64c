//! Calls, emails and fuel deals.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_ts, get_enum, get_opt_date, get_ts, sql_limit};
use super::Storage;
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::{Call, DealStatus, Email, EmailDirection, FuelDeal, GoalType};

const CALL_COLUMNS: &str = "id, contact_id, called_at, duration_minutes, outcome, notes";
const EMAIL_COLUMNS: &str = "id, contact_id, sent_at, direction, subject, body";
const DEAL_COLUMNS: &str = "id, contact_id, supplier_id, vessel_name, imo, port, fuel_type, \
     quantity_mt, sell_price_usd, buy_price_usd, delivery_date, status, created_at";

impl Storage {
    /// Log a call and mark the contact as reached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown contact, or a database error.
    pub fn log_call(&self, call: &Call) -> Result<i64> {
        self.require_contact(call.contact_id)?;
        self.conn.execute(
            r"
            INSERT INTO calls (contact_id, called_at, duration_minutes, outcome, notes)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                call.contact_id,
                encode_ts(&call.called_at),
                call.duration_minutes,
                call.outcome.as_str(),
                call.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Logged call {} to contact {}", id, call.contact_id);
        self.publish(Table::Calls, ChangeOp::Insert, id);
        self.touch_last_contacted(call.contact_id, call.called_at)?;
        Ok(id)
    }

    /// Recent calls, newest first, optionally for one contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_calls(&self, contact_id: Option<i64>, limit: usize) -> Result<Vec<Call>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE (?1 IS NULL OR contact_id = ?1)
             ORDER BY called_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let calls = stmt
            .query_map(params![contact_id, sql_limit(limit)], row_to_call)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(calls)
    }

    /// Calls in `[since, until)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn calls_between(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<Call>> {
        let sql = format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE called_at >= ?1 AND called_at < ?2 ORDER BY called_at"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let calls = stmt
            .query_map(params![encode_ts(&since), encode_ts(&until)], row_to_call)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(calls)
    }

    /// Delete a logged call.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_call(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM calls WHERE id = ?1", [id])?;
        if affected > 0 {
            self.publish(Table::Calls, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Log an email and mark the contact as reached.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty subject, [`Error::NotFound`]
    /// for an unknown contact, or a database error.
    pub fn log_email(&self, email: &Email) -> Result<i64> {
        email.validate()?;
        self.require_contact(email.contact_id)?;
        self.conn.execute(
            r"
            INSERT INTO emails (contact_id, sent_at, direction, subject, body)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                email.contact_id,
                encode_ts(&email.sent_at),
                email.direction.as_str(),
                email.subject.trim(),
                email.body,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Logged {} email {} for contact {}", email.direction, id, email.contact_id);
        self.publish(Table::Emails, ChangeOp::Insert, id);
        self.touch_last_contacted(email.contact_id, email.sent_at)?;
        Ok(id)
    }

    /// Recent emails, newest first, optionally for one contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_emails(&self, contact_id: Option<i64>, limit: usize) -> Result<Vec<Email>> {
        let sql = format!(
            "SELECT {EMAIL_COLUMNS} FROM emails WHERE (?1 IS NULL OR contact_id = ?1)
             ORDER BY sent_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let emails = stmt
            .query_map(params![contact_id, sql_limit(limit)], row_to_email)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(emails)
    }

    /// Emails in `[since, until)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn emails_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Email>> {
        let sql = format!(
            "SELECT {EMAIL_COLUMNS} FROM emails WHERE sent_at >= ?1 AND sent_at < ?2 ORDER BY sent_at"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let emails = stmt
            .query_map(params![encode_ts(&since), encode_ts(&until)], row_to_email)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(emails)
    }

    /// Delete a logged email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_email(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM emails WHERE id = ?1", [id])?;
        if affected > 0 {
            self.publish(Table::Emails, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Enter a fuel deal and return its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid deal, [`Error::NotFound`]
    /// for an unknown contact or supplier, or a database error.
    pub fn insert_deal(&self, deal: &FuelDeal) -> Result<i64> {
        let mut deal = deal.clone();
        deal.validate()?;
        self.require_contact(deal.contact_id)?;
        if let Some(supplier_id) = deal.supplier_id {
            if self.get_supplier(supplier_id)?.is_none() {
                return Err(Error::not_found("supplier", supplier_id));
            }
        }

        self.conn.execute(
            r"
            INSERT INTO fuel_deals (contact_id, supplier_id, vessel_name, imo, port, fuel_type,
                quantity_mt, sell_price_usd, buy_price_usd, delivery_date, status, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
            params![
                deal.contact_id,
                deal.supplier_id,
                deal.vessel_name.trim(),
                deal.imo,
                deal.port.trim(),
                deal.fuel_type.as_str(),
                deal.quantity_mt,
                deal.sell_price_usd,
                deal.buy_price_usd,
                deal.delivery_date.map(|d| d.to_string()),
                deal.status.as_str(),
                encode_ts(&deal.created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted deal {} for {}", id, deal.vessel_name);
        self.publish(Table::FuelDeals, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Get a deal by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_deal(&self, id: i64) -> Result<Option<FuelDeal>> {
        let sql = format!("SELECT {DEAL_COLUMNS} FROM fuel_deals WHERE id = ?1");
        Ok(self.conn.query_row(&sql, [id], row_to_deal).optional()?)
    }

    /// Move a deal to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown deal, or a database error.
    pub fn set_deal_status(&self, id: i64, status: DealStatus) -> Result<()> {
        let affected = self.conn.execute(
            "UPDATE fuel_deals SET status = ?2 WHERE id = ?1",
            params![id, status.as_str()],
        )?;
        if affected == 0 {
            return Err(Error::not_found("deal", id));
        }
        debug!("Deal {} is now {}", id, status);
        self.publish(Table::FuelDeals, ChangeOp::Update, id);
        Ok(())
    }

    /// Recent deals, newest first, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_deals(&self, status: Option<DealStatus>, limit: usize) -> Result<Vec<FuelDeal>> {
        let sql = format!(
            "SELECT {DEAL_COLUMNS} FROM fuel_deals WHERE (?1 IS NULL OR status = ?1)
             ORDER BY created_at DESC, id DESC LIMIT ?2"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let deals = stmt
            .query_map(
                params![status.map(DealStatus::as_str), sql_limit(limit)],
                row_to_deal,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deals)
    }

    /// Deals entered in `[since, until)`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn deals_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<FuelDeal>> {
        let sql = format!(
            "SELECT {DEAL_COLUMNS} FROM fuel_deals WHERE created_at >= ?1 AND created_at < ?2 ORDER BY created_at"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let deals = stmt
            .query_map(params![encode_ts(&since), encode_ts(&until)], row_to_deal)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(deals)
    }

    /// Delete a deal.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_deal(&self, id: i64) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM fuel_deals WHERE id = ?1", [id])?;
        if affected > 0 {
            debug!("Deleted deal {}", id);
            self.publish(Table::FuelDeals, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Count activity of one goal type in `[since, until)`.
    ///
    /// Calls count regardless of outcome, emails only when sent, deals
    /// unless cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_activity(
        &self,
        goal_type: GoalType,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u32> {
        let since = encode_ts(&since);
        let until = encode_ts(&until);
        let count: i64 = match goal_type {
            GoalType::Calls => self.conn.query_row(
                "SELECT COUNT(*) FROM calls WHERE called_at >= ?1 AND called_at < ?2",
                params![since, until],
                |row| row.get(0),
            )?,
            GoalType::Emails => self.conn.query_row(
                "SELECT COUNT(*) FROM emails WHERE sent_at >= ?1 AND sent_at < ?2 AND direction = ?3",
                params![since, until, EmailDirection::Sent.as_str()],
                |row| row.get(0),
            )?,
            GoalType::Deals => self.conn.query_row(
                "SELECT COUNT(*) FROM fuel_deals WHERE created_at >= ?1 AND created_at < ?2 AND status != ?3",
                params![since, until, DealStatus::Cancelled.as_str()],
                |row| row.get(0),
            )?,
        };
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

fn row_to_call(row: &Row) -> rusqlite::Result<Call> {
    Ok(Call {
        id: Some(row.get(0)?),
        contact_id: row.get(1)?,
        called_at: get_ts(row, 2)?,
        duration_minutes: row.get(3)?,
        outcome: get_enum(row, 4)?,
        notes: row.get(5)?,
    })
}

fn row_to_email(row: &Row) -> rusqlite::Result<Email> {
    Ok(Email {
        id: Some(row.get(0)?),
        contact_id: row.get(1)?,
        sent_at: get_ts(row, 2)?,
        direction: get_enum(row, 3)?,
        subject: row.get(4)?,
        body: row.get(5)?,
    })
}

fn row_to_deal(row: &Row) -> rusqlite::Result<FuelDeal> {
    Ok(FuelDeal {
        id: Some(row.get(0)?),
        contact_id: row.get(1)?,
        supplier_id: row.get(2)?,
        vessel_name: row.get(3)?,
        imo: row.get(4)?,
        port: row.get(5)?,
        fuel_type: get_enum(row, 6)?,
        quantity_mt: row.get(7)?,
        sell_price_usd: row.get(8)?,
        buy_price_usd: row.get(9)?,
        delivery_date: get_opt_date(row, 10)?,
        status: get_enum(row, 11)?,
        created_at: get_ts(row, 12)?,
    })
}
