//! 损伤描述翻译
//!
//! 站点损伤标签（主损伤 + 损失类型）→ 波兰语标签，未收录的部分原样保留。

use phf::phf_map;

static DAMAGE_LABELS: phf::Map<&'static str, &'static str> = phf_map! {
    // 主损伤
    "All Over" => "Całość",
    "Electrical" => "Elektryka",
    "Engine Burn" => "Spalony Silnik",
    "Engine Damage" => "Uszkodzenie Silnika",
    "Exterior Burn" => "Spalony Zewnętrznie",
    "Flood" => "Powódź",
    "Front" => "Przód",
    "Front & Rear" => "Przód i Tył",
    "Front End" => "Przednia Część",
    "Hail" => "Grad",
    "Interior Burn" => "Spalony Wewnętrznie",
    "Left Front" => "Lewy Przód",
    "Left Rear" => "Lewy Tył",
    "Left Side" => "Lewy Bok",
    "Mechanical" => "Mechaniczne",
    "Rear" => "Tył",
    "Right Front" => "Prawy Przód",
    "Right Rear" => "Prawy Tył",
    "Right Side" => "Prawy Bok",
    "Roll Over" => "Dachowanie",
    "Rollover" => "Dachowanie",
    "Suspension" => "Zawieszenie",
    "Theft" => "Kradzież",
    "Total Burn" => "Całkowicie Spalony",
    "Vandalized" => "Wandalizm",
    "Undercarriage" => "Podwozie",
    "Unknown" => "Nieznane",
    "Strip" => "Ogołocony",
    "None" => "Brak",
    // 损失类型
    "Collision" => "Kolizja",
    "Wreck" => "Wrak / Zniszczenie",
    "Water" => "Wodne",
    "Fire" => "Pożar",
    "Salvage" => "Wrak / Do kasacja",
    "Biohazard" => "Zagrożenie Biologiczne",
};

/// 翻译组合损伤描述，逐段查表
pub fn translate_damage(damage: &str) -> String {
    if damage.trim().is_empty() {
        return String::new();
    }
    damage
        .split(" / ")
        .map(|part| {
            let part = part.trim();
            DAMAGE_LABELS.get(part).copied().unwrap_or(part)
        })
        .collect::<Vec<_>>()
        .join(" / ")
}
