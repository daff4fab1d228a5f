//! Entity types and their field tables.
//!
//! Every entity type maps a fixed list of properties to an external
//! (database column / XML element) name and a [`Strategy`]. The list order
//! is the order in which fields are written into item sections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::strategy::Strategy;
use super::strategy::Strategy::{
    ClockSpeed, Date, DateTime, Integer, MacAddress, MemorySize, SlotSize, Text,
};

/// Inventory item types, each written to its own XML section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    AudioDevice,
    Controller,
    Cpu,
    Display,
    DisplayController,
    ExtensionSlot,
    Filesystem,
    InputDevice,
    MemorySlot,
    Modem,
    MsOfficeProduct,
    NetworkInterface,
    Port,
    Printer,
    RegistryData,
    Software,
    StorageDevice,
    VirtualMachine,
}

impl ItemType {
    pub const ALL: [ItemType; 18] = [
        ItemType::AudioDevice,
        ItemType::Controller,
        ItemType::Cpu,
        ItemType::Display,
        ItemType::DisplayController,
        ItemType::ExtensionSlot,
        ItemType::Filesystem,
        ItemType::InputDevice,
        ItemType::MemorySlot,
        ItemType::Modem,
        ItemType::MsOfficeProduct,
        ItemType::NetworkInterface,
        ItemType::Port,
        ItemType::Printer,
        ItemType::RegistryData,
        ItemType::Software,
        ItemType::StorageDevice,
        ItemType::VirtualMachine,
    ];

    /// Internal type identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::AudioDevice => "audiodevice",
            ItemType::Controller => "controller",
            ItemType::Cpu => "cpu",
            ItemType::Display => "display",
            ItemType::DisplayController => "displaycontroller",
            ItemType::ExtensionSlot => "extensionslot",
            ItemType::Filesystem => "filesystem",
            ItemType::InputDevice => "inputdevice",
            ItemType::MemorySlot => "memoryslot",
            ItemType::Modem => "modem",
            ItemType::MsOfficeProduct => "msofficeproduct",
            ItemType::NetworkInterface => "networkinterface",
            ItemType::Port => "port",
            ItemType::Printer => "printer",
            ItemType::RegistryData => "registrydata",
            ItemType::Software => "software",
            ItemType::StorageDevice => "storagedevice",
            ItemType::VirtualMachine => "virtualmachine",
        }
    }

    /// XML section name.
    pub fn section(self) -> &'static str {
        match self {
            ItemType::AudioDevice => "SOUNDS",
            ItemType::Controller => "CONTROLLERS",
            ItemType::Cpu => "CPUS",
            ItemType::Display => "MONITORS",
            ItemType::DisplayController => "VIDEOS",
            ItemType::ExtensionSlot => "SLOTS",
            ItemType::Filesystem => "DRIVES",
            ItemType::InputDevice => "INPUTS",
            ItemType::MemorySlot => "MEMORIES",
            ItemType::Modem => "MODEMS",
            ItemType::MsOfficeProduct => "OFFICEPACK",
            ItemType::NetworkInterface => "NETWORKS",
            ItemType::Port => "PORTS",
            ItemType::Printer => "PRINTERS",
            ItemType::RegistryData => "REGISTRY",
            ItemType::Software => "SOFTWARES",
            ItemType::StorageDevice => "STORAGES",
            ItemType::VirtualMachine => "VIRTUALMACHINES",
        }
    }

    pub fn from_section(section: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.section() == section)
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown item type: {s}"))
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every entity that has a field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// Client properties written to the `HARDWARE` section.
    Client,
    Bios,
    Group,
    Package,
    RegistryValueDefinition,
    Item(ItemType),
}

impl EntityType {
    pub fn all() -> impl Iterator<Item = EntityType> {
        [
            EntityType::Client,
            EntityType::Bios,
            EntityType::Group,
            EntityType::Package,
            EntityType::RegistryValueDefinition,
        ]
        .into_iter()
        .chain(ItemType::ALL.into_iter().map(EntityType::Item))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Client => "client",
            EntityType::Bios => "bios",
            EntityType::Group => "group",
            EntityType::Package => "package",
            EntityType::RegistryValueDefinition => "registryvaluedefinition",
            EntityType::Item(item) => item.as_str(),
        }
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(EntityType::Client),
            "bios" => Ok(EntityType::Bios),
            "group" => Ok(EntityType::Group),
            "package" => Ok(EntityType::Package),
            "registryvaluedefinition" => Ok(EntityType::RegistryValueDefinition),
            other => other
                .parse::<ItemType>()
                .map(EntityType::Item)
                .map_err(|_| format!("unknown entity type: {other}")),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Property name on the typed record.
    pub property: &'static str,
    /// External name: XML element and snapshot key.
    pub element: &'static str,
    pub strategy: Strategy,
}

const fn field(property: &'static str, element: &'static str, strategy: Strategy) -> FieldMapping {
    FieldMapping {
        property,
        element,
        strategy,
    }
}

const CLIENT: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("user_name", "USERID", Text),
    field("user_domain", "USERDOMAIN", Text),
    field("workgroup", "WORKGROUP", Text),
    field("os_name", "OSNAME", Text),
    field("os_version_number", "OSVERSION", Text),
    field("os_version_string", "OSCOMMENTS", Text),
    field("os_comment", "DESCRIPTION", Text),
    field("cpu_type", "PROCESSORT", Text),
    field("cpu_clock", "PROCESSORS", ClockSpeed),
    field("cpu_cores", "PROCESSORN", Integer),
    field("physical_memory", "MEMORY", Integer),
    field("swap_memory", "SWAP", Integer),
    field("ip_address", "IPADDR", Text),
    field("dns_server", "DNS", Text),
    field("default_gateway", "DEFAULTGATEWAY", Text),
    field("windows_company", "WINCOMPANY", Text),
    field("windows_owner", "WINOWNER", Text),
    field("windows_product_id", "WINPRODID", Text),
    field("windows_product_key", "WINPRODKEY", Text),
    field("uuid", "UUID", Text),
    field("architecture", "ARCH", Text),
    field("inventory_date", "LASTDATE", DateTime),
    field("last_contact_date", "LASTCOME", DateTime),
    field("checksum", "CHECKSUM", Integer),
];

const BIOS: &[FieldMapping] = &[
    field("manufacturer", "SMANUFACTURER", Text),
    field("product_name", "SMODEL", Text),
    field("serial", "SSN", Text),
    field("type", "TYPE", Text),
    field("bios_manufacturer", "BMANUFACTURER", Text),
    field("bios_version", "BVERSION", Text),
    field("bios_date", "BDATE", Text),
    field("asset_tag", "ASSETTAG", Text),
];

const PACKAGE: &[FieldMapping] = &[
    field("id", "ID", Integer),
    field("name", "NAME", Text),
    field("platform", "PLATFORM", Strategy::Platform),
    field("comment", "COMMENT", Text),
    field("priority", "PRIORITY", Integer),
];

const REGISTRY_VALUE_DEFINITION: &[FieldMapping] = &[
    field("id", "ID", Integer),
    field("name", "NAME", Text),
    field("root_key", "REGTREE", Integer),
    field("sub_keys", "REGKEY", Text),
    field("value", "REGVALUE", Strategy::RegistryValue),
];

const AUDIO_DEVICE: &[FieldMapping] = &[
    field("manufacturer", "MANUFACTURER", Text),
    field("name", "NAME", Text),
    field("description", "DESCRIPTION", Text),
];

const CONTROLLER: &[FieldMapping] = &[
    field("type", "TYPE", Text),
    field("manufacturer", "MANUFACTURER", Text),
    field("name", "NAME", Text),
    field("version", "VERSION", Text),
    field("description", "DESCRIPTION", Text),
];

const CPU: &[FieldMapping] = &[
    field("manufacturer", "MANUFACTURER", Text),
    field("type", "TYPE", Text),
    field("nominal_clock", "SPEED", ClockSpeed),
    field("current_clock", "CURRENT_SPEED", ClockSpeed),
    field("cores", "CORES", Integer),
    field("logical_cpus", "LOGICAL_CPUS", Integer),
    field("l2_cache_size", "L2CACHESIZE", Integer),
    field("architecture", "CPUARCH", Text),
    field("data_width", "DATA_WIDTH", Integer),
    field("current_address_width", "CURRENT_ADDRESS_WIDTH", Integer),
    field("voltage", "VOLTAGE", Text),
    field("socket", "SOCKET", Text),
    field("serial", "SERIALNUMBER", Text),
];

const DISPLAY: &[FieldMapping] = &[
    field("manufacturer", "MANUFACTURER", Text),
    field("description", "DESCRIPTION", Text),
    field("serial", "SERIAL", Text),
    field("edid", "CAPTION", Text),
    field("type", "TYPE", Text),
];

const DISPLAY_CONTROLLER: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("chipset", "CHIPSET", Text),
    field("memory", "MEMORY", MemorySize),
    field("current_resolution", "RESOLUTION", Text),
];

const EXTENSION_SLOT: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("description", "DESCRIPTION", Text),
    field("slot_id", "DESIGNATION", Text),
    field("status", "STATUS", Text),
    field("is_shared", "PSHARE", Text),
];

const FILESYSTEM: &[FieldMapping] = &[
    field("letter", "LETTER", Text),
    field("type", "TYPE", Text),
    field("filesystem", "FILESYSTEM", Text),
    field("size", "TOTAL", Integer),
    field("free_space", "FREE", Integer),
    field("label", "VOLUMN", Text),
    field("creation_date", "CREATEDATE", Date),
    field("serial", "SERIAL", Text),
];

const INPUT_DEVICE: &[FieldMapping] = &[
    field("type", "TYPE", Text),
    field("manufacturer", "MANUFACTURER", Text),
    field("description", "CAPTION", Text),
    field("comment", "DESCRIPTION", Text),
    field("interface", "INTERFACE", Text),
    field("pointing_type", "POINTTYPE", Text),
];

const MEMORY_SLOT: &[FieldMapping] = &[
    field("slot_number", "NUMSLOTS", Integer),
    field("size", "CAPACITY", SlotSize),
    field("type", "TYPE", Text),
    field("clock", "SPEED", ClockSpeed),
    field("caption", "CAPTION", Text),
    field("description", "DESCRIPTION", Text),
    field("serial", "SERIALNUMBER", Text),
];

const MODEM: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("model", "MODEL", Text),
    field("description", "DESCRIPTION", Text),
    field("type", "TYPE", Text),
];

const MS_OFFICE_PRODUCT: &[FieldMapping] = &[
    field("name", "PRODUCT", Text),
    field("version", "OFFICEVERSION", Text),
    field("extra_description", "NOTE", Text),
    field("architecture", "ARCH", Integer),
    field("product_key", "OFFICEKEY", Text),
    field("product_id", "PRODUCTID", Text),
    field("guid", "GUID", Text),
    field("type", "TYPE", Integer),
];

const NETWORK_INTERFACE: &[FieldMapping] = &[
    field("description", "DESCRIPTION", Text),
    field("rate", "SPEED", Text),
    field("mac_address", "MACADDR", MacAddress),
    field("ip_address", "IPADDRESS", Text),
    field("netmask", "IPMASK", Text),
    field("gateway", "IPGATEWAY", Text),
    field("subnet", "IPSUBNET", Text),
    field("dhcp_server", "IPDHCP", Text),
    field("status", "STATUS", Text),
    field("type", "TYPE", Text),
    field("type_mib", "TYPEMIB", Text),
    field("is_blacklisted", "VIRTUALDEV", Integer),
];

const PORT: &[FieldMapping] = &[
    field("type", "TYPE", Text),
    field("name", "NAME", Text),
    field("connector", "CAPTION", Text),
    field("description", "DESCRIPTION", Text),
];

const PRINTER: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("driver", "DRIVER", Text),
    field("port", "PORT", Text),
    field("description", "DESCRIPTION", Text),
    field("server_name", "SERVERNAME", Text),
    field("share_name", "SHARENAME", Text),
    field("resolution", "RESOLUTION", Text),
    field("comment", "COMMENT", Text),
    field("shared", "SHARED", Integer),
    field("network", "NETWORK", Integer),
];

const REGISTRY_DATA: &[FieldMapping] = &[
    field("value", "NAME", Text),
    field("data", "REGVALUE", Text),
];

const SOFTWARE: &[FieldMapping] = &[
    field("publisher", "PUBLISHER", Text),
    field("name", "NAME", Text),
    field("version", "VERSION", Text),
    field("install_location", "FOLDER", Text),
    field("comment", "COMMENTS", Text),
    field("guid", "GUID", Text),
    field("language", "LANGUAGE", Text),
    field("installation_date", "INSTALLDATE", Date),
    field("architecture", "BITSWIDTH", Integer),
    field("size", "FILESIZE", Integer),
    field("source", "SOURCE", Integer),
];

const STORAGE_DEVICE: &[FieldMapping] = &[
    field("manufacturer", "MANUFACTURER", Text),
    field("name", "NAME", Text),
    field("model", "MODEL", Text),
    field("description", "DESCRIPTION", Text),
    field("type", "TYPE", Text),
    field("size", "DISKSIZE", Integer),
    field("serial", "SERIALNUMBER", Text),
    field("firmware", "FIRMWARE", Text),
];

const VIRTUAL_MACHINE: &[FieldMapping] = &[
    field("name", "NAME", Text),
    field("status", "STATUS", Text),
    field("product", "SUBSYSTEM", Text),
    field("type", "VMTYPE", Text),
    field("uuid", "UUID", Text),
    field("cpus", "VCPU", Integer),
    field("memory", "MEMORY", MemorySize),
];

/// Field table of an entity type.
///
/// Group timestamps depend on the configured cache expiration, so the group
/// table is assembled at registry construction.
pub(crate) fn field_table(entity: EntityType, group_cache_expiration: i64) -> Vec<FieldMapping> {
    let table: &[FieldMapping] = match entity {
        EntityType::Group => {
            return vec![
                field("id", "ID", Integer),
                field("name", "NAME", Text),
                field("description", "DESCRIPTION", Text),
                field("creation_date", "CREATE_TIME", Strategy::Timestamp { offset: 0 }),
                field("dynamic_members_sql", "REQUEST", Text),
                field(
                    "cache_creation_date",
                    "CREATE_TIME_CACHE",
                    Strategy::Timestamp { offset: 0 },
                ),
                field(
                    "cache_expiration_date",
                    "REVALIDATE_FROM",
                    Strategy::Timestamp {
                        offset: group_cache_expiration,
                    },
                ),
            ];
        }
        EntityType::Client => CLIENT,
        EntityType::Bios => BIOS,
        EntityType::Package => PACKAGE,
        EntityType::RegistryValueDefinition => REGISTRY_VALUE_DEFINITION,
        EntityType::Item(item) => match item {
            ItemType::AudioDevice => AUDIO_DEVICE,
            ItemType::Controller => CONTROLLER,
            ItemType::Cpu => CPU,
            ItemType::Display => DISPLAY,
            ItemType::DisplayController => DISPLAY_CONTROLLER,
            ItemType::ExtensionSlot => EXTENSION_SLOT,
            ItemType::Filesystem => FILESYSTEM,
            ItemType::InputDevice => INPUT_DEVICE,
            ItemType::MemorySlot => MEMORY_SLOT,
            ItemType::Modem => MODEM,
            ItemType::MsOfficeProduct => MS_OFFICE_PRODUCT,
            ItemType::NetworkInterface => NETWORK_INTERFACE,
            ItemType::Port => PORT,
            ItemType::Printer => PRINTER,
            ItemType::RegistryData => REGISTRY_DATA,
            ItemType::Software => SOFTWARE,
            ItemType::StorageDevice => STORAGE_DEVICE,
            ItemType::VirtualMachine => VIRTUAL_MACHINE,
        },
    };
    table.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_section_mapping_is_one_to_one() {
        let sections: HashSet<_> = ItemType::ALL.iter().map(|t| t.section()).collect();
        assert_eq!(sections.len(), 18);
        for item in ItemType::ALL {
            assert_eq!(ItemType::from_section(item.section()), Some(item));
            assert_eq!(item.as_str().parse::<ItemType>(), Ok(item));
        }
        assert_eq!(ItemType::Cpu.section(), "CPUS");
        assert_eq!(ItemType::NetworkInterface.section(), "NETWORKS");
        assert_eq!(ItemType::Software.section(), "SOFTWARES");
        assert_eq!(ItemType::StorageDevice.section(), "STORAGES");
    }

    #[test]
    fn test_entity_names_round_trip() {
        for entity in EntityType::all() {
            assert_eq!(entity.as_str().parse::<EntityType>(), Ok(entity));
        }
        assert!("toaster".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_field_tables_have_unique_names() {
        for entity in EntityType::all() {
            let table = field_table(entity, 0);
            assert!(!table.is_empty(), "{entity} has no fields");
            let properties: HashSet<_> = table.iter().map(|f| f.property).collect();
            let elements: HashSet<_> = table.iter().map(|f| f.element).collect();
            assert_eq!(properties.len(), table.len(), "duplicate property in {entity}");
            assert_eq!(elements.len(), table.len(), "duplicate element in {entity}");
        }
    }

    #[test]
    fn test_group_table_uses_cache_expiration_offset() {
        let table = field_table(EntityType::Group, 900);
        let expiration = table
            .iter()
            .find(|f| f.property == "cache_expiration_date")
            .unwrap();
        assert_eq!(expiration.strategy, Strategy::Timestamp { offset: 900 });
    }
}
