use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::rows::{encode_ts, get_json_list, get_ts};
use super::{collect_ids, Storage};
use crate::error::{Error, Result};
use crate::feed::{ChangeOp, Table};
use crate::model::{FuelType, Supplier, SupplierPort};

const SUPPLIER_COLUMNS: &str = "id, name, email, phone, notes, created_at";
const PORT_COLUMNS: &str = "id, supplier_id, port, country, delivery, fuels, notes";

impl Storage {
    /// Insert a supplier and return its id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid record, or a database error.
    pub fn insert_supplier(&self, supplier: &Supplier) -> Result<i64> {
        supplier.validate()?;
        self.conn.execute(
            "INSERT INTO suppliers (name, email, phone, notes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                supplier.name.trim(),
                supplier.email,
                supplier.phone,
                supplier.notes,
                encode_ts(&supplier.created_at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted supplier {} ({})", id, supplier.name);
        self.publish(Table::Suppliers, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Get a supplier by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_supplier(&self, id: i64) -> Result<Option<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, [id], row_to_supplier)
            .optional()?)
    }

    /// All suppliers by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_suppliers(&self) -> Result<Vec<Supplier>> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM suppliers ORDER BY name COLLATE NOCASE");
        let mut stmt = self.conn.prepare(&sql)?;
        let suppliers = stmt
            .query_map([], row_to_supplier)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(suppliers)
    }

    /// Delete a supplier and its ports.
    ///
    /// Deals and tasks that named the supplier are kept and unlinked; a
    /// change is published for each of them and for every removed port.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_supplier(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let ports = collect_ids(&tx, "SELECT id FROM supplier_ports WHERE supplier_id = ?1", id)?;
        let deals = collect_ids(&tx, "SELECT id FROM fuel_deals WHERE supplier_id = ?1", id)?;
        let tasks = collect_ids(&tx, "SELECT id FROM tasks WHERE supplier_id = ?1", id)?;

        let affected = tx.execute("DELETE FROM suppliers WHERE id = ?1", [id])?;
        if affected == 0 {
            return Ok(false);
        }
        tx.commit()?;

        debug!("Deleted supplier {} with {} ports", id, ports.len());
        self.publish(Table::Suppliers, ChangeOp::Delete, id);
        self.publish_all(Table::SupplierPorts, ChangeOp::Delete, &ports);
        self.publish_all(Table::FuelDeals, ChangeOp::Update, &deals);
        self.publish_all(Table::Tasks, ChangeOp::Update, &tasks);
        Ok(true)
    }

    /// Add a port to a supplier and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown supplier, a validation error
    /// for an invalid record, or a database error.
    pub fn add_supplier_port(&self, port: &SupplierPort) -> Result<i64> {
        let mut port = port.clone();
        port.validate()?;
        if self.get_supplier(port.supplier_id)?.is_none() {
            return Err(Error::not_found("supplier", port.supplier_id));
        }

        self.conn.execute(
            r"
            INSERT INTO supplier_ports (supplier_id, port, country, delivery, fuels, notes)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
            params![
                port.supplier_id,
                port.port.trim(),
                port.country,
                serde_json::to_string(&port.delivery)?,
                serde_json::to_string(&port.fuels)?,
                port.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Added port {} ({}) to supplier {}", id, port.port, port.supplier_id);
        self.publish(Table::SupplierPorts, ChangeOp::Insert, id);
        Ok(id)
    }

    /// Ports of one supplier, by port name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn supplier_ports(&self, supplier_id: i64) -> Result<Vec<SupplierPort>> {
        let sql = format!(
            "SELECT {PORT_COLUMNS} FROM supplier_ports WHERE supplier_id = ?1 ORDER BY port COLLATE NOCASE"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ports = stmt
            .query_map([supplier_id], row_to_port)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ports)
    }

    /// Remove a port entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_supplier_port(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM supplier_ports WHERE id = ?1", [id])?;
        if affected > 0 {
            self.publish(Table::SupplierPorts, ChangeOp::Delete, id);
        }
        Ok(affected > 0)
    }

    /// Suppliers serving a port (case-insensitive match), optionally only
    /// those that can supply `fuel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn find_ports(
        &self,
        port: &str,
        fuel: Option<FuelType>,
    ) -> Result<Vec<(Supplier, SupplierPort)>> {
        let sql = format!(
            "SELECT {PORT_COLUMNS} FROM supplier_ports WHERE port = ?1 COLLATE NOCASE ORDER BY supplier_id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ports = stmt
            .query_map([port.trim()], row_to_port)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut found = Vec::new();
        for entry in ports {
            if fuel.is_some_and(|fuel| !entry.supports(fuel)) {
                continue;
            }
            if let Some(supplier) = self.get_supplier(entry.supplier_id)? {
                found.push((supplier, entry));
            }
        }
        Ok(found)
    }
}

fn row_to_supplier(row: &Row) -> rusqlite::Result<Supplier> {
    Ok(Supplier {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        notes: row.get(4)?,
        created_at: get_ts(row, 5)?,
    })
}

fn row_to_port(row: &Row) -> rusqlite::Result<SupplierPort> {
    Ok(SupplierPort {
        id: Some(row.get(0)?),
        supplier_id: row.get(1)?,
        port: row.get(2)?,
        country: row.get(3)?,
        delivery: get_json_list(row, 4)?,
        fuels: get_json_list(row, 5)?,
        notes: row.get(6)?,
    })
}
