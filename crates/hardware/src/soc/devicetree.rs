//! Device-tree generation from a finished machine.
//!
//! The tree is built from the wired [`Machine`], after every device, core and memory
//! channel is final, and rendered as device-tree source. Encoding the source into a
//! flattened blob is left to the simulation kernel.

use std::fmt;

use crate::common::constants::{PCI_ECAM_BASE, PCI_ECAM_SIZE, UART_BASE, UART_SIZE};
use crate::soc::builder::Machine;
use crate::soc::cluster::Pmu;
use crate::soc::pci::PciAddress;

/// GIC interrupt type for private peripheral interrupts.
const GIC_PPI: u32 = 1;
/// Level-high trigger with all cores in the CPU mask.
const GIC_PPI_FLAGS: u32 = 0xf04;

/// Value of a device-tree property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// Boolean property with no value.
    Empty,
    /// One or more NUL-separated strings.
    Strings(Vec<String>),
    /// 32-bit cells.
    Cells(Vec<u32>),
}

/// A named property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property value.
    pub value: PropValue,
}

/// A device-tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Node name including any unit address.
    pub name: String,
    /// Properties in insertion order.
    pub properties: Vec<Property>,
    /// Child nodes in insertion order.
    pub children: Vec<Node>,
}

impl Node {
    /// Creates an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    fn prop(mut self, name: &str, value: PropValue) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            value,
        });
        self
    }

    fn string(self, name: &str, value: &str) -> Self {
        self.prop(name, PropValue::Strings(vec![value.to_string()]))
    }

    fn cells(self, name: &str, cells: &[u32]) -> Self {
        self.prop(name, PropValue::Cells(cells.to_vec()))
    }

    fn child(mut self, node: Self) -> Self {
        self.children.push(node);
        self
    }

    /// Finds a direct child by name.
    pub fn find(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Finds a property by name.
    pub fn property(&self, name: &str) -> Option<&PropValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    fn write(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "\t".repeat(depth);
        writeln!(f, "{indent}{} {{", self.name)?;
        for p in &self.properties {
            write!(f, "{indent}\t{}", p.name)?;
            match &p.value {
                PropValue::Empty => {}
                PropValue::Strings(list) => {
                    let quoted: Vec<String> = list.iter().map(|s| format!("\"{s}\"")).collect();
                    write!(f, " = {}", quoted.join(", "))?;
                }
                PropValue::Cells(cells) => {
                    let hex: Vec<String> = cells.iter().map(|c| format!("{c:#x}")).collect();
                    write!(f, " = <{}>", hex.join(" "))?;
                }
            }
            writeln!(f, ";")?;
        }
        for child in &self.children {
            writeln!(f)?;
            child.write(f, depth + 1)?;
        }
        writeln!(f, "{indent}}};")
    }
}

/// A complete device tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceTree {
    /// Root node (`/`).
    pub root: Node,
}

const fn split64(value: u64) -> [u32; 2] {
    [(value >> 32) as u32, value as u32]
}

const fn reg64(base: u64, size: u64) -> [u32; 4] {
    let b = split64(base);
    let s = split64(size);
    [b[0], b[1], s[0], s[1]]
}

/// First cell of a PCI unit address.
const fn pci_phys_hi(addr: PciAddress) -> u32 {
    (addr.bus as u32) << 16 | (addr.device as u32) << 11 | (addr.function as u32) << 8
}

impl DeviceTree {
    /// Describes `machine`: memory, cores, PMU, UART and every PCI function.
    pub fn from_machine(machine: &Machine) -> Self {
        let uart = format!("uart@{UART_BASE:x}");
        let mut root = Node::new("/")
            .string("model", "fsbricks Arm full-system platform")
            .prop(
                "compatible",
                PropValue::Strings(vec!["arm,vexpress".into(), "arm,vexpress-gem5".into()]),
            )
            .cells("#address-cells", &[2])
            .cells("#size-cells", &[2])
            .child(Node::new("chosen").string("stdout-path", &format!("/{uart}")));

        let memory = &machine.memory;
        root = root.child(
            Node::new(format!("memory@{:x}", memory.base))
                .string("device_type", "memory")
                .cells("reg", &reg64(memory.base, memory.size)),
        );

        let mut cpus = Node::new("cpus")
            .cells("#address-cells", &[1])
            .cells("#size-cells", &[0]);
        for core in machine.clusters.iter().flat_map(|c| &c.cores) {
            cpus = cpus.child(
                Node::new(format!("cpu@{}", core.id))
                    .string("device_type", "cpu")
                    .string("compatible", "arm,armv8")
                    .cells("reg", &[core.id])
                    .string("enable-method", "psci"),
            );
        }
        root = root
            .child(cpus)
            .child(Node::new("psci").string("compatible", "arm,psci-1.0").string("method", "hvc"));

        let pmu_irq = machine
            .clusters
            .iter()
            .flat_map(|c| &c.cores)
            .find_map(|core| core.pmu.map(Pmu::gic_ppi_index));
        if let Some(irq) = pmu_irq {
            root = root.child(
                Node::new("pmu")
                    .string("compatible", "arm,armv8-pmuv3")
                    .cells("interrupts", &[GIC_PPI, irq, GIC_PPI_FLAGS]),
            );
        }

        root = root.child(
            Node::new(uart)
                .prop(
                    "compatible",
                    PropValue::Strings(vec!["arm,pl011".into(), "arm,primecell".into()]),
                )
                .cells("reg", &reg64(UART_BASE, UART_SIZE)),
        );

        let mut pci = Node::new(format!("pci@{PCI_ECAM_BASE:x}"))
            .string("compatible", "pci-host-ecam-generic")
            .string("device_type", "pci")
            .cells("#address-cells", &[3])
            .cells("#size-cells", &[2])
            .cells("bus-range", &[0, 0])
            .cells("reg", &reg64(PCI_ECAM_BASE, PCI_ECAM_SIZE));
        for attachment in machine.interconnect.devices() {
            let addr = attachment.address;
            pci = pci.child(
                Node::new(format!("dev@{:x},{:x}", addr.device, addr.function))
                    .string("compatible", attachment.device.compatible())
                    .cells("reg", &[pci_phys_hi(addr), 0, 0, 0, 0]),
            );
        }
        root = root.child(pci);

        Self { root }
    }
}

impl fmt::Display for DeviceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "/dts-v1/;")?;
        writeln!(f)?;
        self.root.write(f, 0)
    }
}
