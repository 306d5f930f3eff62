//! Static catalog of the sources participating in each distro's build.
//!
//! The catalog is a pure lookup: nothing here touches the network or the
//! filesystem. Which repositories make up the dev and mcu stages is fixed
//! per distro, as is the default ignore-list used to seed package ignore
//! state before anything is fetched.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;

use crate::core::source::{Source, Stage};
use crate::util::diagnostic::UnknownDistroError;

/// Supported ROS 2 distros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distro {
    Humble,
    Iron,
    Jazzy,
    Rolling,
    Kilted,
}

/// All supported distros, in release order.
pub const DISTROS: &[Distro] = &[
    Distro::Humble,
    Distro::Iron,
    Distro::Jazzy,
    Distro::Rolling,
    Distro::Kilted,
];

impl Distro {
    /// The distro name, which is also the branch checked out from ROS 2
    /// repositories.
    pub fn as_str(&self) -> &'static str {
        match self {
            Distro::Humble => "humble",
            Distro::Iron => "iron",
            Distro::Jazzy => "jazzy",
            Distro::Rolling => "rolling",
            Distro::Kilted => "kilted",
        }
    }
}

impl fmt::Display for Distro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distro {
    type Err = UnknownDistroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "humble" => Ok(Distro::Humble),
            "iron" => Ok(Distro::Iron),
            "jazzy" => Ok(Distro::Jazzy),
            "rolling" => Ok(Distro::Rolling),
            "kilted" => Ok(Distro::Kilted),
            _ => Err(UnknownDistroError {
                distro: s.to_string(),
                supported: DISTROS
                    .iter()
                    .map(|d| d.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Branch the eProsima middleware repositories use for ROS 2 builds,
/// independent of distro.
const EPROSIMA_BRANCH: &str = "ros2";

/// (name, url) table of the host-side dependency stage.
const DEV_SOURCES: &[(&str, &str)] = &[
    ("ament_cmake", "https://github.com/ament/ament_cmake"),
    ("ament_lint", "https://github.com/ament/ament_lint"),
    ("ament_package", "https://github.com/ament/ament_package"),
    ("googletest", "https://github.com/ament/googletest"),
    ("ament_cmake_ros", "https://github.com/ros2/ament_cmake_ros"),
    ("ament_index", "https://github.com/ament/ament_index"),
];

/// (name, url) table of the cross-compiled mcu stage, excluding the
/// distro-independent eProsima middleware.
const MCU_SOURCES: &[(&str, &str)] = &[
    ("rcl", "https://github.com/ros2/rcl"),
    ("rclc", "https://github.com/ros2/rclc"),
    ("rcutils", "https://github.com/ros2/rcutils"),
    ("rcl_logging", "https://github.com/ros2/rcl_logging"),
    ("micro_ros_msgs", "https://github.com/micro-ROS/micro_ros_msgs"),
    ("rmw_microxrcedds", "https://github.com/micro-ROS/rmw-microxrcedds"),
    (
        "rosidl_typesupport_microxrcedds",
        "https://github.com/micro-ROS/rosidl_typesupport_microxrcedds",
    ),
    ("rosidl", "https://github.com/ros2/rosidl"),
    ("rmw", "https://github.com/ros2/rmw"),
    ("rcl_interfaces", "https://github.com/ros2/rcl_interfaces"),
    ("rosidl_defaults", "https://github.com/ros2/rosidl_defaults"),
    (
        "unique_identifier_msgs",
        "https://github.com/ros2/unique_identifier_msgs",
    ),
    ("common_interfaces", "https://github.com/ros2/common_interfaces"),
    (
        "test_interface_files",
        "https://github.com/ros2/test_interface_files",
    ),
    ("rmw_implementation", "https://github.com/ros2/rmw_implementation"),
    ("rosidl_typesupport", "https://github.com/ros2/rosidl_typesupport"),
    ("ros2_tracing", "https://github.com/ros2/ros2_tracing"),
    (
        "micro_ros_utilities",
        "https://github.com/micro-ROS/micro_ros_utilities",
    ),
];

/// eProsima middleware repositories, fetched for the mcu stage on their
/// own branch.
const EPROSIMA_SOURCES: &[(&str, &str)] = &[
    ("micro-CDR", "https://github.com/eProsima/micro-CDR"),
    (
        "Micro-XRCE-DDS-Client",
        "https://github.com/eProsima/Micro-XRCE-DDS-Client",
    ),
];

/// Packages never built for the embedded target, regardless of distro.
const IGNORE_COMMON: &[&str] = &[
    "rosidl_typesupport_introspection_c",
    "rosidl_typesupport_introspection_cpp",
    "rcl_logging_log4cxx",
    "rcl_logging_spdlog",
    "rcl_yaml_param_parser",
    "rclc_examples",
    "test_msgs",
    "ros2trace",
    "tracetools_launch",
    "tracetools_read",
    "tracetools_test",
    "tracetools_trace",
];

/// Newer distros grew a Python tracing binding that must be skipped too.
const IGNORE_WITH_LTTNGPY: &[&str] = &[
    "rosidl_typesupport_introspection_c",
    "rosidl_typesupport_introspection_cpp",
    "rcl_logging_log4cxx",
    "rcl_logging_spdlog",
    "rcl_yaml_param_parser",
    "rclc_examples",
    "test_msgs",
    "ros2trace",
    "tracetools_launch",
    "tracetools_read",
    "tracetools_test",
    "tracetools_trace",
    "lttngpy",
];

/// Per-distro static catalog of sources and default ignore-lists.
pub struct SourceCatalog;

impl SourceCatalog {
    /// Sources to fetch for `distro` at `stage`, in fetch order.
    pub fn sources_for(distro: Distro, stage: Stage) -> Result<Vec<Source>> {
        let branch = distro.as_str();

        match stage {
            Stage::Dev => DEV_SOURCES
                .iter()
                .map(|(name, url)| Source::new(*name, url, Some(branch), Stage::Dev))
                .collect(),
            Stage::Mcu => {
                let mut sources: Vec<Source> = EPROSIMA_SOURCES
                    .iter()
                    .map(|(name, url)| {
                        Source::new(*name, url, Some(EPROSIMA_BRANCH), Stage::Mcu)
                    })
                    .collect::<Result<_>>()?;

                for (name, url) in MCU_SOURCES {
                    sources.push(Source::new(*name, url, Some(branch), Stage::Mcu)?);
                }

                Ok(sources)
            }
        }
    }

    /// Package names ignored by default for `distro`, used to seed ignore
    /// state before any package is fetched.
    pub fn default_ignore_list(distro: Distro) -> &'static [&'static str] {
        match distro {
            Distro::Humble | Distro::Iron => IGNORE_COMMON,
            Distro::Jazzy | Distro::Rolling | Distro::Kilted => IGNORE_WITH_LTTNGPY,
        }
    }
}
