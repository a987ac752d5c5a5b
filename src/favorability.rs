//! Favorability evaluation
//!
//! Fuses one weather snapshot with one solar position into a weighted,
//! explainable verdict. Pure given its inputs and never fails: a factor
//! whose underlying value is unknown is simply unfavorable with an
//! explanatory reason, biasing toward caution.

use crate::data::{
    ConditionSet, ConditionVerdict, RainbowAssessment, RainbowDirection, SunPosition,
    WeatherSnapshot,
};

/// Maximum sun altitude at which a rainbow arc can clear the horizon.
const SUN_ALTITUDE_MAX: f64 = 42.0;
/// Minimum relative humidity supporting airborne droplets.
const HUMIDITY_MIN: f64 = 50.0;
/// Maximum cloud cover that still admits direct sunlight.
const CLOUD_COVER_MAX: f64 = 80.0;
/// Minimum visibility in meters.
const VISIBILITY_MIN: f64 = 1000.0;

/// Factor weights, summing to 100 so the score is a plain percentage.
const WEIGHT_SUN_ALTITUDE: u8 = 30;
const WEIGHT_PRECIPITATION: u8 = 30;
const WEIGHT_HUMIDITY: u8 = 15;
const WEIGHT_CLOUD_COVER: u8 = 15;
const WEIGHT_VISIBILITY: u8 = 10;

/// Score at or above which conditions count as favorable.
const FAVORABLE_THRESHOLD: u8 = 60;

/// OpenWeather condition id ranges indicating active precipitation:
/// thunderstorm/drizzle/rain (200-531) and snow (600-622).
const RAIN_CODES: std::ops::RangeInclusive<i32> = 200..=531;
const SNOW_CODES: std::ops::RangeInclusive<i32> = 600..=622;

const CARDINALS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// Evaluates rainbow favorability for one snapshot and sun position.
///
/// `sun` is `None` when solar geometry is unavailable; the sun-altitude
/// factor then reads as unknown and no viewing direction is produced.
pub fn evaluate(snapshot: &WeatherSnapshot, sun: Option<&SunPosition>) -> RainbowAssessment {
    let conditions = ConditionSet {
        sun_altitude: judge_sun_altitude(sun),
        precipitation: judge_precipitation(snapshot),
        humidity: judge_humidity(snapshot),
        cloud_cover: judge_cloud_cover(snapshot),
        visibility: judge_visibility(snapshot),
    };

    let score = weighted_score(&conditions);
    let is_favorable = score >= FAVORABLE_THRESHOLD;

    RainbowAssessment {
        is_favorable,
        score,
        recommendations: recommendations(score, &conditions),
        rainbow_direction: sun.map(|s| antisolar_direction(s.azimuth)),
        sun_altitude: sun.map(|s| s.altitude),
        sun_azimuth: sun.map(|s| s.azimuth),
        conditions,
        data_available: true,
    }
}

/// Assessment for the case where no weather data exists at all.
///
/// Explicitly marked unavailable rather than silently unfavorable.
pub fn no_data_assessment() -> RainbowAssessment {
    let unknown = |factor: &str| ConditionVerdict {
        value: None,
        favorable: false,
        reason: format!("{} unknown", factor),
    };

    RainbowAssessment {
        is_favorable: false,
        score: 0,
        conditions: ConditionSet {
            sun_altitude: unknown("Sun altitude"),
            precipitation: unknown("Precipitation"),
            humidity: unknown("Humidity"),
            cloud_cover: unknown("Cloud cover"),
            visibility: unknown("Visibility"),
        },
        rainbow_direction: None,
        sun_altitude: None,
        sun_azimuth: None,
        recommendations: vec![
            "No weather data is available for this location and time.".to_string(),
        ],
        data_available: false,
    }
}

fn judge_sun_altitude(sun: Option<&SunPosition>) -> ConditionVerdict {
    let Some(sun) = sun else {
        return ConditionVerdict {
            value: None,
            favorable: false,
            reason: "Sun altitude unknown".to_string(),
        };
    };

    let altitude = sun.altitude;
    let (favorable, reason) = if altitude < 0.0 {
        (false, format!("Sun is below the horizon ({:.1}°)", altitude))
    } else if altitude > SUN_ALTITUDE_MAX {
        (
            false,
            format!(
                "Sun too high at {:.1}° (rainbows need at most {:.0}°)",
                altitude, SUN_ALTITUDE_MAX
            ),
        )
    } else {
        (
            true,
            format!("Sun at {:.1}° keeps the rainbow arc above the horizon", altitude),
        )
    };

    ConditionVerdict {
        value: Some(altitude),
        favorable,
        reason,
    }
}

fn judge_precipitation(snapshot: &WeatherSnapshot) -> ConditionVerdict {
    // Missing precipitation fields read as 0 mm, matching the provider's
    // habit of omitting the keys when dry; the condition code still counts.
    let rain = snapshot.rain_1h.unwrap_or(0.0);
    let snow = snapshot.snow_1h.unwrap_or(0.0);
    let code_active = snapshot
        .weather_code
        .map(|code| RAIN_CODES.contains(&code) || SNOW_CODES.contains(&code))
        .unwrap_or(false);

    let favorable = rain > 0.0 || snow > 0.0 || code_active;
    let reason = if favorable {
        "Active precipitation seeds the air with droplets".to_string()
    } else {
        "No recent precipitation detected".to_string()
    };

    ConditionVerdict {
        value: Some(rain + snow),
        favorable,
        reason,
    }
}

fn judge_humidity(snapshot: &WeatherSnapshot) -> ConditionVerdict {
    let Some(humidity) = snapshot.humidity else {
        return ConditionVerdict {
            value: None,
            favorable: false,
            reason: "Humidity unknown".to_string(),
        };
    };

    let favorable = humidity >= HUMIDITY_MIN;
    let reason = if favorable {
        format!("Humidity {:.0}% supports droplet formation", humidity)
    } else {
        format!(
            "Humidity {:.0}% is too dry (need at least {:.0}%)",
            humidity, HUMIDITY_MIN
        )
    };

    ConditionVerdict {
        value: Some(humidity),
        favorable,
        reason,
    }
}

fn judge_cloud_cover(snapshot: &WeatherSnapshot) -> ConditionVerdict {
    let Some(cloud_cover) = snapshot.cloud_cover else {
        return ConditionVerdict {
            value: None,
            favorable: false,
            reason: "Cloud cover unknown".to_string(),
        };
    };

    let favorable = cloud_cover <= CLOUD_COVER_MAX;
    let reason = if favorable {
        format!("Cloud cover {:.0}% leaves room for direct sun", cloud_cover)
    } else {
        format!("Cloud cover {:.0}% likely blocks the sun", cloud_cover)
    };

    ConditionVerdict {
        value: Some(cloud_cover),
        favorable,
        reason,
    }
}

fn judge_visibility(snapshot: &WeatherSnapshot) -> ConditionVerdict {
    let Some(visibility) = snapshot.visibility else {
        return ConditionVerdict {
            value: None,
            favorable: false,
            reason: "Visibility unknown".to_string(),
        };
    };

    let favorable = visibility >= VISIBILITY_MIN;
    let reason = if favorable {
        format!("Visibility {:.0} m is clear enough", visibility)
    } else {
        format!("Visibility {:.0} m is too hazy", visibility)
    };

    ConditionVerdict {
        value: Some(visibility),
        favorable,
        reason,
    }
}

fn weighted_score(conditions: &ConditionSet) -> u8 {
    let mut score = 0u8;
    for (verdict, weight) in [
        (&conditions.sun_altitude, WEIGHT_SUN_ALTITUDE),
        (&conditions.precipitation, WEIGHT_PRECIPITATION),
        (&conditions.humidity, WEIGHT_HUMIDITY),
        (&conditions.cloud_cover, WEIGHT_CLOUD_COVER),
        (&conditions.visibility, WEIGHT_VISIBILITY),
    ] {
        if verdict.favorable {
            score += weight;
        }
    }
    score
}

/// Direction to the antisolar point, where a rainbow is centered.
fn antisolar_direction(sun_azimuth: f64) -> RainbowDirection {
    let azimuth = ((sun_azimuth + 180.0) * 10.0).round() / 10.0 % 360.0;
    let azimuth = azimuth.rem_euclid(360.0);
    let index = (((azimuth + 11.25) / 22.5).floor() as usize) % 16;
    let cardinal = CARDINALS[index].to_string();

    RainbowDirection {
        azimuth,
        description: format!(
            "Look {} (bearing {:.1}°), directly opposite the sun",
            cardinal, azimuth
        ),
        cardinal,
    }
}

/// Headline by score band, then one corrective line per unfavorable factor
/// in fixed factor order.
fn recommendations(score: u8, conditions: &ConditionSet) -> Vec<String> {
    let headline = if score >= 80 {
        "Excellent rainbow conditions! Look opposite the sun."
    } else if score >= FAVORABLE_THRESHOLD {
        "Good rainbow potential. Keep an eye on the sky."
    } else if score >= 40 {
        "Some favorable factors, but a rainbow is unlikely right now."
    } else {
        "Conditions are not favorable for rainbows."
    };

    let mut lines = vec![headline.to_string()];
    let correctives: [(&ConditionVerdict, &str); 5] = [
        (
            &conditions.sun_altitude,
            "Try again when the sun is up but below 42 degrees, typically morning or late afternoon.",
        ),
        (
            &conditions.precipitation,
            "Watch for rain showers; rainbows need water droplets in the air.",
        ),
        (
            &conditions.humidity,
            "Higher humidity (50% or more) improves the odds.",
        ),
        (
            &conditions.cloud_cover,
            "Heavy cloud blocks direct sunlight; wait for breaks in the cover.",
        ),
        (&conditions.visibility, "Wait for haze or fog to clear."),
    ];

    for (verdict, line) in correctives {
        if !verdict.favorable {
            lines.push(line.to_string());
        }
    }
    lines
}
